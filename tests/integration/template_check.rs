//! The offline template authoring gate.

use plinth::geometry::Tolerances;
use plinth::simulate::{check_library, simulate_template};
use plinth::template::TemplateLibrary;
use tempfile::TempDir;

#[test]
fn builtin_library_passes_the_gate() {
    let reports = check_library(&TemplateLibrary::builtin(), &Tolerances::default());
    assert!(!reports.is_empty());
    for report in &reports {
        assert!(
            report.all_placed(),
            "template '{}' failed offline validation: {:?}",
            report.template,
            report.failures
        );
        assert_eq!(report.placed, report.total);
    }
}

#[test]
fn authored_template_file_is_gated() {
    let dir = TempDir::new().unwrap();

    // A well-formed file whose geometry is broken: the second piece wants
    // the same ground spot as the first.
    std::fs::write(
        dir.path().join("twins.toml"),
        r##"
name = "twins"

[[phases]]
label = "all"

[[phases.pieces]]
shape = "box"
offset = { x = 0.0, y = 0.5, z = 0.0 }
scale = { x = 1.0, y = 1.0, z = 1.0 }
color = "#ff0000"

[[phases.pieces]]
shape = "box"
offset = { x = 0.2, y = 0.5, z = 0.0 }
scale = { x = 1.0, y = 1.0, z = 1.0 }
color = "#00ff00"
"##,
    )
    .unwrap();

    let library = TemplateLibrary::from_dir(dir.path()).unwrap();
    let template = library.get("twins").unwrap();
    let report = simulate_template(template, (0.0, 0.0), 0.0, &Tolerances::default());

    assert!(!report.all_placed());
    assert_eq!(report.placed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
}
