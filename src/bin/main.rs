extern crate clap;
extern crate prodesk;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use prodesk::export;
use prodesk::import::{ImportDefaults, ImportField, ImportSession};
use prodesk::inventory::{DefaultInventory, Entry, EntryStatus, Location, NewEntry, Rack};
use std::error::Error;
use std::path::Path;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    let location_args = || {
        vec![
            Arg::with_name("room").long("room").takes_value(true).help("Room the file is stored in"),
            Arg::with_name("rack").long("rack").takes_value(true).help("Rack inside the room"),
            Arg::with_name("shelf").long("shelf").takes_value(true).help("Shelf index on the rack"),
            Arg::with_name("box").long("box").takes_value(true).help("Box on the shelf"),
        ]
    };
    let status_arg = Arg::with_name("status")
        .long("status")
        .takes_value(true)
        .help("In Storage, Checked Out, In Use or Closed");
    let by_arg = Arg::with_name("by")
        .long("by")
        .takes_value(true)
        .default_value("CLI")
        .help("Name recorded as the author of history events");
    let id_arg = Arg::with_name("ID").required(true).index(1).help("Id of the entry");

    let entry_add_cmd = SubCommand::with_name("entry-add")
        .about("creates a new entry (tracked physical file)")
        .arg(
            Arg::with_name("file-no")
                .long("file-no")
                .required(true)
                .takes_value(true)
                .help("File number printed on the file"),
        )
        .arg(
            Arg::with_name("file-type")
                .long("file-type")
                .required(true)
                .takes_value(true)
                .help("File type, document numbers are unique per file type"),
        )
        .arg(Arg::with_name("company").long("company").takes_value(true))
        .arg(Arg::with_name("owner").long("owner").takes_value(true))
        .arg(Arg::with_name("description").long("description").takes_value(true))
        .args(&location_args())
        .arg(status_arg.clone())
        .arg(by_arg.clone());

    let entry_list_cmd = SubCommand::with_name("entry-list")
        .about("lists entries, optionally filtered by file type or file number pattern")
        .arg(Arg::with_name("file-type").long("file-type").takes_value(true))
        .arg(
            Arg::with_name("search")
                .long("search")
                .takes_value(true)
                .help("Glob pattern matched against the file number, e.g. 'F-2024-*'"),
        );

    let entry_show_cmd = SubCommand::with_name("entry-show")
        .about("prints an entry together with its location history")
        .arg(id_arg.clone());

    let entry_move_cmd = SubCommand::with_name("entry-move")
        .about("moves an entry to a new location and records the move in its history")
        .arg(id_arg.clone())
        .args(&location_args())
        .arg(status_arg)
        .arg(by_arg)
        .arg(Arg::with_name("notes").long("notes").takes_value(true));

    let rack_args = || {
        vec![
            Arg::with_name("room").long("room").required(true).takes_value(true),
            Arg::with_name("rack").long("rack").required(true).takes_value(true),
        ]
    };
    let rack_add_cmd = SubCommand::with_name("rack-add")
        .about("adds a rack and derives its shelves (numbered row by row)")
        .args(&rack_args())
        .arg(Arg::with_name("rows").long("rows").required(true).takes_value(true))
        .arg(Arg::with_name("columns").long("columns").required(true).takes_value(true))
        .arg(
            Arg::with_name("capacity")
                .long("capacity")
                .required(true)
                .takes_value(true)
                .help("Number of entries fitting on one shelf"),
        );
    let shelves_cmd = SubCommand::with_name("shelves")
        .about("lists the shelves of a rack with their usage")
        .args(&rack_args());

    let import_cmd = SubCommand::with_name("import")
        .about("imports document history rows from a spreadsheet into an entry")
        .arg(id_arg.clone())
        .arg(
            Arg::with_name("SPREADSHEET")
                .required(true)
                .index(2)
                .help("Spreadsheet file (.xlsx, .xls, .ods), only the first sheet is read"),
        )
        .arg(
            Arg::with_name("map")
                .long("map")
                .short("m")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Maps a column onto a field (HEADER=docNumber), HEADER=none removes a mapping"),
        )
        .arg(
            Arg::with_name("commit")
                .long("commit")
                .takes_value(false)
                .help("Appends the rows to the history if all of them are valid"),
        )
        .arg(
            Arg::with_name("by")
                .long("by")
                .takes_value(true)
                .help("Name recorded as the author of imported events (default: Import)"),
        );

    let export_cmd = SubCommand::with_name("export-history")
        .about("exports the location history of an entry to an .xlsx file")
        .arg(id_arg)
        .arg(Arg::with_name("OUT").required(true).index(2).help("Target .xlsx file"));

    let task_add_cmd = SubCommand::with_name("task-add")
        .about("adds a task to the dashboard")
        .arg(Arg::with_name("TITLE").required(true).index(1))
        .arg(Arg::with_name("due").long("due").takes_value(true).help("Due date (YYYY-MM-DD)"));
    let task_list_cmd = SubCommand::with_name("task-list").about("lists all tasks, open ones first");
    let task_done_cmd = SubCommand::with_name("task-done")
        .about("toggles the done flag of a task")
        .arg(Arg::with_name("ID").required(true).index(1).help("Id of the task"));

    let optimize_cmd = SubCommand::with_name("optimize")
        .about("optimizes the underlying SQLite database (can save space and speed up operations)");
    let migrate_cmd = SubCommand::with_name("migrate-doc-fields")
        .about("fills the document number/position fields of older history events from their notes");

    let db_path_arg = Arg::with_name("DB_PATH")
        .required(true)
        .index(1)
        .help("Path of the ProDesk database file");
    let cli = App::new("ProDesk")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Tracks physical files, their storage locations and document history")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(db_path_arg)
        .subcommand(entry_add_cmd)
        .subcommand(entry_list_cmd)
        .subcommand(entry_show_cmd)
        .subcommand(entry_move_cmd)
        .subcommand(rack_add_cmd)
        .subcommand(shelves_cmd)
        .subcommand(import_cmd)
        .subcommand(export_cmd)
        .subcommand(task_add_cmd)
        .subcommand(task_list_cmd)
        .subcommand(task_done_cmd)
        .subcommand(optimize_cmd)
        .subcommand(migrate_cmd)
        .get_matches();

    init_logging();

    let db_path = cli.value_of("DB_PATH").unwrap_or_default();
    let result = DefaultInventory::open(db_path)
        .map_err(Box::<dyn Error>::from)
        .and_then(|inventory| match cli.subcommand() {
            ("entry-add", Some(cmd_cli)) => add_entry(&inventory, cmd_cli),
            ("entry-list", Some(cmd_cli)) => list_entries(&inventory, cmd_cli),
            ("entry-show", Some(cmd_cli)) => show_entry(&inventory, cmd_cli),
            ("entry-move", Some(cmd_cli)) => move_entry(&inventory, cmd_cli),
            ("rack-add", Some(cmd_cli)) => add_rack(&inventory, cmd_cli),
            ("shelves", Some(cmd_cli)) => list_shelves(&inventory, cmd_cli),
            ("import", Some(cmd_cli)) => import_history(&inventory, cmd_cli),
            ("export-history", Some(cmd_cli)) => export_history(&inventory, cmd_cli),
            ("task-add", Some(cmd_cli)) => add_task(&inventory, cmd_cli),
            ("task-list", Some(_)) => list_tasks(&inventory),
            ("task-done", Some(cmd_cli)) => toggle_task(&inventory, cmd_cli),
            ("optimize", Some(_)) => optimize_database(&inventory),
            ("migrate-doc-fields", Some(_)) => migrate_doc_fields(&inventory),
            _ => {
                println!("Please specify the command you want to perform on the database.");
                println!("See --help for more information.");
                Ok(())
            }
        });

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        let mut cause = error.source();
        while let Some(source) = cause {
            eprintln!("  caused by: {}", source);
            cause = source.source();
        }
        std::process::exit(1);
    }
}

// Log output goes to stderr, filtered by RUST_LOG (warnings only by default).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn add_entry(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let text = |name: &str| cmd_cli.value_of(name).unwrap_or_default().to_string();

    let entry = inventory.create_entry(
        NewEntry {
            file_no: text("file-no"),
            file_type: text("file-type"),
            company: text("company"),
            owner: text("owner"),
            description: text("description"),
            location: location_from(cmd_cli),
            status: status_from(cmd_cli)?.unwrap_or_default(),
        },
        cmd_cli.value_of("by").unwrap_or_default(),
    )?;

    println!("Created entry {} (file no. {})", entry.id, entry.file_no);
    Ok(())
}

fn list_entries(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let mut entries = match cmd_cli.value_of("search") {
        Some(pattern) => inventory.search_entries(pattern)?,
        None => inventory.list_entries()?,
    };
    if let Some(file_type) = cmd_cli.value_of("file-type") {
        entries.retain(|entry| entry.file_type == file_type);
    }

    if entries.is_empty() {
        println!("No entries found.");
    }
    for entry in &entries {
        print_entry_line(entry);
    }
    Ok(())
}

fn show_entry(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let entry = inventory.find_entry(cmd_cli.value_of("ID").unwrap_or_default())?;

    println!("Entry:       {}", entry.id);
    println!("File No.:    {}", entry.file_no);
    println!("File Type:   {}", entry.file_type);
    println!("Company:     {}", entry.company);
    println!("Owner:       {}", entry.owner);
    println!("Description: {}", entry.description);
    println!("Created At:  {}", entry.created_at);
    println!("Status:      {}", entry.status);
    println!("Location:    {}", entry.location.snapshot());
    println!("History:");
    for (index, event) in entry.location_history.iter().enumerate() {
        println!(
            "  [{}] {} | {} | {} | {} | {}",
            index, event.timestamp, event.location, event.status, event.updated_by, event.notes
        );
    }
    Ok(())
}

fn move_entry(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let id = cmd_cli.value_of("ID").unwrap_or_default();
    let current = inventory.find_entry(id)?;

    let entry = inventory.move_entry(
        id,
        location_from(cmd_cli),
        status_from(cmd_cli)?.unwrap_or(current.status),
        cmd_cli.value_of("by").unwrap_or_default(),
        cmd_cli.value_of("notes").unwrap_or_default(),
    )?;

    println!(
        "Moved entry {} to '{}' ({})",
        entry.id,
        entry.location.snapshot(),
        entry.status
    );
    Ok(())
}

fn add_rack(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let number = |name: &str| -> Result<u32, Box<dyn Error>> {
        let value = cmd_cli.value_of(name).unwrap_or_default();
        value
            .parse()
            .map_err(|_| format!("--{} must be a positive number, got '{}'", name, value).into())
    };

    let shelves = inventory.create_rack(Rack {
        room: cmd_cli.value_of("room").unwrap_or_default().to_string(),
        rack: cmd_cli.value_of("rack").unwrap_or_default().to_string(),
        rows: number("rows")?,
        columns: number("columns")?,
        shelf_capacity: number("capacity")?,
    })?;

    println!("Created rack with {} shelves", shelves.len());
    Ok(())
}

fn list_shelves(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let shelves = inventory.shelves_for_rack(
        cmd_cli.value_of("room").unwrap_or_default(),
        cmd_cli.value_of("rack").unwrap_or_default(),
    )?;

    for shelf in shelves {
        let occupied = inventory
            .shelf_usage(&shelf.id)?
            .map(|usage| usage.occupied)
            .unwrap_or_default();
        println!(
            "{} (row {}, column {}): {}/{}",
            shelf.id, shelf.row, shelf.column, occupied, shelf.capacity
        );
    }
    Ok(())
}

fn import_history(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let mut session = ImportSession::new(inventory, cmd_cli.value_of("ID").unwrap_or_default())?;
    if let Some(actor) = cmd_cli.value_of("by") {
        session = session.with_defaults(ImportDefaults {
            actor: actor.to_string(),
            ..Default::default()
        });
    }

    session.load_file(Path::new(cmd_cli.value_of("SPREADSHEET").unwrap_or_default()))?;
    for mapping in cmd_cli.values_of("map").into_iter().flatten() {
        let (header, field) = parse_mapping(mapping)?;
        session.set_mapping(header, field)?;
    }
    session.validate()?;

    println!("Columns:");
    for header in session.headers() {
        match session.mapping().get(header) {
            Some(field) => println!("  {} -> {}", header, field),
            None => println!("  {} (not imported)", header),
        }
    }
    println!("Rows:");
    for (index, row) in session.rows().iter().enumerate() {
        let normalized = &row.normalized;
        let errors: Vec<String> = row
            .validation
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        println!(
            "  [{}] #{} (Pos: {}) {}",
            index,
            normalized.doc_number.as_deref().unwrap_or("-"),
            normalized.doc_position.as_deref().unwrap_or("-"),
            if errors.is_empty() {
                "OK".to_string()
            } else {
                errors.join(", ")
            }
        );
    }

    if cmd_cli.is_present("commit") {
        let outcome = session.commit()?;
        println!(
            "Committed {} history events ({} in total).",
            outcome.added_events, outcome.history_len
        );
    } else if session.is_ready() {
        println!("Ready to commit (re-run with --commit).");
    } else {
        println!("Not ready to commit, fix the mapping or the rows listed above.");
    }
    Ok(())
}

fn export_history(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let entry = inventory.find_entry(cmd_cli.value_of("ID").unwrap_or_default())?;
    let out_path = Path::new(cmd_cli.value_of("OUT").unwrap_or_default());

    let rows = export::export_history(&entry, out_path)?;
    println!("Exported {} history events to '{}'", rows, out_path.display());
    Ok(())
}

fn add_task(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let task = inventory.add_task(
        cmd_cli.value_of("TITLE").unwrap_or_default(),
        cmd_cli.value_of("due"),
    )?;

    println!("Created task {}", task.id);
    Ok(())
}

fn list_tasks(inventory: &DefaultInventory) -> CliResult {
    for task in inventory.list_tasks()? {
        println!(
            "[{}] {} {}{}",
            if task.done { "x" } else { " " },
            task.id,
            task.title,
            task.due_date
                .map(|due| format!(" (due {})", due))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn toggle_task(inventory: &DefaultInventory, cmd_cli: &ArgMatches) -> CliResult {
    let id = cmd_cli.value_of("ID").unwrap_or_default();
    let done = inventory.toggle_task(id)?;

    println!("Task {} is {}", id, if done { "done" } else { "open" });
    Ok(())
}

fn optimize_database(inventory: &DefaultInventory) -> CliResult {
    println!("Optimizing database file...");
    inventory.store().optimize_database()?;
    println!("Optimization Complete!");
    Ok(())
}

fn migrate_doc_fields(inventory: &DefaultInventory) -> CliResult {
    let changed = inventory.migrate_doc_fields()?;
    println!("Updated {} history events.", changed);
    Ok(())
}

fn print_entry_line(entry: &Entry) {
    println!(
        "{}  {}  {}  {}  {}",
        entry.id,
        entry.file_no,
        entry.file_type,
        entry.status,
        entry.location.snapshot()
    );
}

fn location_from(cmd_cli: &ArgMatches) -> Location {
    Location::new(
        cmd_cli.value_of("room").unwrap_or_default(),
        cmd_cli.value_of("rack").unwrap_or_default(),
        cmd_cli.value_of("shelf").unwrap_or_default(),
        cmd_cli.value_of("box").unwrap_or_default(),
    )
}

fn status_from(cmd_cli: &ArgMatches) -> Result<Option<EntryStatus>, Box<dyn Error>> {
    match cmd_cli.value_of("status") {
        Some(status) => Ok(Some(status.parse::<EntryStatus>()?)),
        None => Ok(None),
    }
}

// HEADER=field, the header may itself contain '='.
fn parse_mapping(mapping: &str) -> Result<(&str, Option<ImportField>), Box<dyn Error>> {
    let split = mapping.rfind('=').ok_or_else(|| format!("--map expects HEADER=field, got '{}'", mapping))?;
    let (header, field) = (&mapping[..split], &mapping[split + 1..]);

    if field.eq_ignore_ascii_case("none") {
        Ok((header, None))
    } else {
        Ok((header, Some(field.parse::<ImportField>()?)))
    }
}
