console.log('ready');
=== END FILE ===
";

#[test]
fn test_response_upserts_files_in_order() {
    // GIVEN a working copy with one file
    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
    files.mark_clean();

    // WHEN the response is parsed and applied
    let patches = parse_patch_response(RESPONSE).unwrap();
    let applied = files.apply_patches(&patches).unwrap();

    // THEN the existing file is replaced in place and the new one appended
    assert_eq!(applied, 2);
    let paths: Vec<&str> = files.paths().collect();
    assert_eq!(paths, vec!["/index.html", "/app.js"]);
    assert_eq!(
        files.get("/index.html").unwrap().text(),
        Some("<h1>B</h1>\n<script src=\"/app.js\"></script>")
    );
    assert_eq!(files.get("/app.js").unwrap().language, Language::JavaScript);
    assert!(files.is_dirty());
}

#[test]
fn test_later_block_for_same_path_wins() {
    let response = "=== FILE: a.txt ===\none\n=== END FILE ===\n\
                    === FILE: /a.txt ===\ntwo\n=== END FILE ===\n";
    let mut files = FileSet::new();
    files
        .apply_patches(&parse_patch_response(response).unwrap())
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files.get("/a.txt").unwrap().text(), Some("two"));
    assert_eq!(ManifestBuilder::build(&files).len(), 1);
}

#[test]
fn test_parse_error_maps_to_invalid_input() {
    let err: ExError = parse_patch_response("=== FILE: a.js ===\nno end")
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(err.op(), Some("parse_patch_response"));
}
