use fixup_bundle::{Error, verify_bundle};

use crate::common::{TestBundle, write_binary};

#[test]
fn allowed_unresolved_plugins_are_left_alone() {
    let mut bundle = TestBundle::new();
    let plugins = bundle.contents().join("lib/QtPlugins/sqldrivers");
    write_binary(&bundle.executable(), None, &[], &["@loader_path/../"]);
    write_binary(
        &plugins.join("libqsqlpsql.dylib"),
        Some("@rpath/lib/QtPlugins/sqldrivers/libqsqlpsql.dylib"),
        &["/usr/local/pgsql/lib/libpq.5.dylib"],
        &["@loader_path/../../../"],
    );

    let platform = bundle.platform();
    let report = verify_bundle(&platform).unwrap();
    assert_eq!(report.objects, 2);
    assert!(report.plans.is_empty());

    // Other plugins may not reference files outside of the bundle.
    write_binary(
        &plugins.join("libqsqlodbc.dylib"),
        Some("@rpath/lib/QtPlugins/sqldrivers/libqsqlodbc.dylib"),
        &["/usr/local/odbc/lib/libodbc.2.dylib"],
        &["@loader_path/../../../"],
    );

    let platform = bundle.platform();
    let err = verify_bundle(&platform).unwrap_err();
    let Error::ProhibitedAbsoluteReference { reference } = err.root() else {
        panic!("expected a prohibited reference, got: {err:?}");
    };
    assert_eq!(reference, "/usr/local/odbc/lib/libodbc.2.dylib");
}

#[test]
fn ambiguous_reference() {
    let mut bundle = TestBundle::new();
    write_binary(&bundle.executable(), None, &["@rpath/libdup.dylib"], &[]);
    write_binary(
        &bundle.contents().join("lib/Slicer-5.6/libdup.dylib"),
        Some("@rpath/lib/Slicer-5.6/libdup.dylib"),
        &[],
        &[],
    );
    write_binary(
        &bundle.contents().join("lib/Other/libdup.dylib"),
        Some("@rpath/lib/Other/libdup.dylib"),
        &[],
        &[],
    );

    let platform = bundle.platform();
    let err = verify_bundle(&platform).unwrap_err();

    let Error::AmbiguousOrMissingResolution {
        reference,
        object,
        candidates,
    } = err.root()
    else {
        panic!("expected an ambiguous reference, got: {err:?}");
    };
    assert_eq!(reference, "@rpath/libdup.dylib");
    assert_eq!(object, &bundle.executable());
    assert_eq!(candidates.len(), 2);
}

#[test]
fn reference_missing_from_bundle() {
    let mut bundle = TestBundle::new();
    write_binary(
        &bundle.executable(),
        None,
        &["@rpath/lib/Slicer-5.6/libnothere.dylib"],
        &[],
    );

    let platform = bundle.platform();
    let err = verify_bundle(&platform).unwrap_err();

    let Error::AmbiguousOrMissingResolution { candidates, .. } = err.root() else {
        panic!("expected a missing reference, got: {err:?}");
    };
    assert!(candidates.is_empty());
}

#[test]
fn aliases_are_planned_once() {
    let mut bundle = TestBundle::new();
    let lib_dir = bundle.contents().join("lib/Slicer-5.6");
    write_binary(
        &bundle.executable(),
        None,
        &["@rpath/lib/Slicer-5.6/libfoo.1.dylib"],
        &["@loader_path/../"],
    );
    write_binary(
        &lib_dir.join("libfoo.dylib"),
        Some(&bundle.build_ref("Foo-build/lib/libfoo.1.dylib")),
        &[],
        &[],
    );
    fs_err::os::unix::fs::symlink("libfoo.dylib", lib_dir.join("libfoo.1.dylib")).unwrap();

    let platform = bundle.platform();
    let report = verify_bundle(&platform).unwrap();

    assert_eq!(report.objects, 2);
    assert_eq!(report.plans.len(), 1);
    let plan = &report.plans[0];
    assert_eq!(plan.object, lib_dir.join("libfoo.1.dylib"));
    assert_eq!(
        plan.edits.set_id.as_deref(),
        Some("@rpath/lib/Slicer-5.6/libfoo.1.dylib")
    );
    assert_eq!(plan.edits.add_hints, ["@loader_path/../../"]);
}

#[test]
fn duplicate_hints_are_deleted_once() {
    let mut bundle = TestBundle::new();
    let build_lib = bundle.build_ref("Slicer-build/lib");
    write_binary(
        &bundle.executable(),
        None,
        &[],
        &[&build_lib, &build_lib, "@loader_path/../"],
    );

    let platform = bundle.platform();
    let report = verify_bundle(&platform).unwrap();

    assert_eq!(report.plans.len(), 1);
    let edits = &report.plans[0].edits;
    assert_eq!(edits.delete_hints, [build_lib]);
    assert!(edits.add_hints.is_empty());
    assert!(edits.change_references.is_empty());
}
