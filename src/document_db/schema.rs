table! {
    documents (path) {
        path -> Text,
        value -> Text,
        updated_at -> Timestamp,
    }
}
