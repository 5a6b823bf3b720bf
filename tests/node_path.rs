//! Global package directories from `NODE_PATH`.
//!
//! Kept in its own test binary: it sets a process-wide environment variable.

mod common;

use std::path::PathBuf;

use common::ThemeFixture;
use conkie::Loader;

#[tokio::test]
async fn test_node_path_packages_are_resolved_and_escaped() {
    let fixture = ThemeFixture::new();
    let global = fixture.root.join("o'brien");
    let other = fixture.root.join("shared");
    let bar_dir = global.join("bar");
    std::fs::create_dir_all(&bar_dir).unwrap();
    std::fs::create_dir_all(&other).unwrap();
    std::fs::write(
        bar_dir.join("package.json"),
        r#"{ "name": "bar", "version": "2.0.0" }"#,
    )
    .unwrap();
    std::env::set_var(
        "NODE_PATH",
        std::env::join_paths([global.clone(), other.clone()]).unwrap(),
    );

    let mut config = fixture.config();
    config.package_dirs = vec![PathBuf::from("/opt/conkie/packages")];
    assert_eq!(
        config.global_package_dirs(),
        vec![PathBuf::from("/opt/conkie/packages"), global, other]
    );

    fixture.index(r#"<script src="<%=paths.theme%>/app.js"></script>"#);
    fixture.theme_file("app.js", "var bar = require('bar');");

    let loaded = Loader::new(config).load().await.unwrap();

    assert!(loaded.document.html.contains(&format!(
        r"<script>var bar = require('{}/o\'brien/bar');</script>",
        fixture.root.display()
    )));
}
