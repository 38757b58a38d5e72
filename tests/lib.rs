extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn main_cmd() -> Command {
        Command::cargo_bin("prodesk").unwrap()
    }

    fn db_path(dir: &TempDir) -> String {
        dir.path().join("prodesk.db").to_str().unwrap().to_string()
    }

    fn cmd_success(dir: &TempDir, cmd: &str, args: Vec<&str>) {
        main_cmd()
            .arg(db_path(dir))
            .arg(cmd)
            .args(args)
            .assert()
            .success();
    }
    fn cmd_should_print(dir: &TempDir, cmd: &str, args: Vec<&str>, expected: &str) {
        main_cmd()
            .arg(db_path(dir))
            .arg(cmd)
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }
    fn cmd_should_fail(dir: &TempDir, cmd: &str, args: Vec<&str>, expected: &str) {
        main_cmd()
            .arg(db_path(dir))
            .arg(cmd)
            .args(args)
            .assert()
            .failure()
            .stderr(predicate::str::contains(expected));
    }

    // Creates an entry and returns its id.
    fn add_entry(dir: &TempDir, file_no: &str, file_type: &str, extra: Vec<&str>) -> String {
        let output = main_cmd()
            .arg(db_path(dir))
            .arg("entry-add")
            .args(vec!["--file-no", file_no, "--file-type", file_type])
            .args(extra)
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        stdout
            .split_whitespace()
            .nth(2)
            .expect("entry-add prints the new id")
            .to_string()
    }

    fn write_import_sheet(dir: &TempDir, name: &str, rows: &[(&str, &str, &str)]) -> String {
        let path = dir.path().join(name);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Doc No").unwrap();
        sheet.write_string(0, 1, "Position").unwrap();
        sheet.write_string(0, 2, "Remarks").unwrap();
        for (index, (doc_number, position, remarks)) in rows.iter().enumerate() {
            let row = index as u32 + 1;
            sheet.write_string(row, 0, *doc_number).unwrap();
            sheet.write_string(row, 1, *position).unwrap();
            sheet.write_string(row, 2, *remarks).unwrap();
        }
        workbook.save(&path).unwrap();

        path.to_str().unwrap().to_string()
    }

    #[test]
    fn add_list_and_show_entries() {
        let dir = tempfile::tempdir().unwrap();
        let id = add_entry(
            &dir,
            "F-2024-001",
            "Contracts",
            vec!["--company", "ACME", "--room", "R1", "--rack", "A", "--shelf", "1"],
        );
        add_entry(&dir, "F-2023-007", "Invoices", vec![]);

        cmd_should_print(&dir, "entry-list", vec![], "F-2023-007");
        cmd_should_print(&dir, "entry-list", vec!["--search", "F-2024-*"], &id);
        cmd_should_print(&dir, "entry-list", vec!["--file-type", "Letters"], "No entries found.");

        cmd_should_print(&dir, "entry-show", vec![&id], "Company:     ACME");
        cmd_should_print(&dir, "entry-show", vec![&id], "Room R1, Rack A, Shelf 1");
        cmd_should_print(&dir, "entry-show", vec![&id], "Created");
    }

    #[test]
    fn entries_need_a_file_number() {
        let dir = tempfile::tempdir().unwrap();
        cmd_should_fail(&dir, "entry-add", vec!["--file-no", " ", "--file-type", "Contracts"], "Error");
    }

    #[test]
    fn move_entries_between_shelves() {
        let dir = tempfile::tempdir().unwrap();
        cmd_should_print(
            &dir,
            "rack-add",
            vec!["--room", "R1", "--rack", "A", "--rows", "2", "--columns", "2", "--capacity", "1"],
            "Created rack with 4 shelves",
        );
        cmd_should_print(&dir, "shelves", vec!["--room", "R1", "--rack", "A"], "(row 2, column 1): 0/1");

        let first = add_entry(&dir, "F-1", "Contracts", vec!["--room", "R1", "--rack", "A", "--shelf", "1"]);
        let second = add_entry(&dir, "F-2", "Contracts", vec![]);
        cmd_should_print(&dir, "shelves", vec!["--room", "R1", "--rack", "A"], "R1-A-1 (row 1, column 1): 1/1");

        cmd_should_fail(
            &dir,
            "entry-move",
            vec![&second, "--room", "R1", "--rack", "A", "--shelf", "1"],
            "Error",
        );
        cmd_should_print(
            &dir,
            "entry-move",
            vec![&first, "--room", "R1", "--rack", "A", "--shelf", "2", "--status", "checked-out"],
            "Checked Out",
        );
        cmd_should_print(&dir, "entry-show", vec![&first], "Shelf 2");
    }

    #[test]
    fn import_history_from_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let id = add_entry(&dir, "F-1", "Contracts", vec![]);
        let sheet = write_import_sheet(&dir, "docs.xlsx", &[("55", "3", "paid"), ("56", "4", "")]);

        cmd_should_print(&dir, "import", vec![&id, &sheet], "Ready to commit");
        cmd_should_print(&dir, "import", vec![&id, &sheet], "Doc No -> docNumber");
        cmd_should_print(
            &dir,
            "import",
            vec![&id, &sheet, "--commit", "--by", "Ann"],
            "Committed 2 history events (3 in total).",
        );
        cmd_should_print(&dir, "entry-show", vec![&id], "Added Doc: #55 (Pos: 3) - paid");
        cmd_should_print(&dir, "entry-show", vec![&id], "| Ann |");

        // The same documents can not be imported twice
        cmd_should_print(&dir, "import", vec![&id, &sheet], "Position already exists");
        cmd_should_fail(&dir, "import", vec![&id, &sheet, "--commit"], "Error");
    }

    #[test]
    fn import_with_manual_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let id = add_entry(&dir, "F-1", "Contracts", vec![]);
        let sheet = write_import_sheet(&dir, "docs.xlsx", &[("55", "3", "paid")]);

        cmd_should_print(
            &dir,
            "import",
            vec![&id, &sheet, "--map", "Position=none"],
            "Not ready to commit",
        );
        cmd_should_fail(&dir, "import", vec![&id, &sheet, "--map", "Position=color"], "Error");
        cmd_should_print(
            &dir,
            "import",
            vec![&id, &sheet, "-m", "Remarks=updatedBy", "--commit"],
            "Committed 1 history events",
        );
        cmd_should_print(&dir, "entry-show", vec![&id], "| paid |");
    }

    #[test]
    fn export_history_to_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let id = add_entry(&dir, "F-1", "Contracts", vec![]);
        let out = dir.path().join("history.xlsx");

        cmd_should_print(
            &dir,
            "export-history",
            vec![&id, out.to_str().unwrap()],
            "Exported 1 history events",
        );
        assert!(out.exists());
    }

    #[test]
    fn manage_tasks() {
        let dir = tempfile::tempdir().unwrap();
        cmd_success(&dir, "task-add", vec!["Archive 2019 files", "--due", "2024-12-31"]);
        cmd_should_print(&dir, "task-list", vec![], "[ ]");
        cmd_should_print(&dir, "task-list", vec![], "Archive 2019 files (due 2024-12-31)");

        let output = main_cmd().arg(db_path(&dir)).arg("task-list").output().unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();
        let task_id = stdout.split_whitespace().nth(2).unwrap().to_string();

        cmd_should_print(&dir, "task-done", vec![&task_id], "is done");
        cmd_should_print(&dir, "task-list", vec![], "[x]");
    }

    #[test]
    fn unknown_entries_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        cmd_should_fail(&dir, "entry-show", vec!["missing"], "missing");
        cmd_should_fail(&dir, "export-history", vec!["missing", "out.xlsx"], "missing");
    }

    #[test]
    fn maintenance_commands() {
        let dir = tempfile::tempdir().unwrap();
        add_entry(&dir, "F-1", "Contracts", vec![]);
        cmd_should_print(&dir, "optimize", vec![], "Optimization Complete!");
        cmd_should_print(&dir, "migrate-doc-fields", vec![], "Updated 0 history events.");
    }
}
