use std::num::NonZeroUsize;

use insta::assert_snapshot;

use fixup_bundle::{PatchOptions, fix_bundle, verify_bundle};

use crate::common::{TestBundle, read_binary, write_binary};

fn sequential() -> PatchOptions {
    PatchOptions {
        dry_run: false,
        concurrency: NonZeroUsize::MIN,
    }
}

#[test]
fn fix_slicer_bundle() {
    let mut bundle = TestBundle::slicer();
    let platform = bundle.platform();

    let report = fix_bundle(&platform, &sequential()).unwrap();

    assert_eq!(report.walk.copied.len(), 3);
    assert!(report.walk.duplicates.is_empty());
    assert_eq!(report.patch.objects, 5);
    assert_eq!(report.patch.rewritten, 5);
    assert_eq!(bundle.writes(), 5);

    assert_snapshot!(bundle.render(&report.patch.plans), @r"
    package/Slicer.app/Contents/lib/Slicer-5.6/libvtkCommonCore-9.2.dylib
      id: @rpath/lib/Slicer-5.6/libvtkCommonCore-9.2.dylib
      add hint: @loader_path/../../
      change: @rpath/libvtksys-9.2.dylib -> @rpath/lib/Slicer-5.6/libvtksys-9.2.dylib
    package/Slicer.app/Contents/lib/Slicer-5.6/libqSlicerApp.dylib
      id: @rpath/lib/Slicer-5.6/libqSlicerApp.dylib
      delete hint: [ROOT]/build/CTK-build/lib
      add hint: @loader_path/../../
      change: [ROOT]/build/VTK-build/lib/libvtkCommonCore-9.2.dylib -> @rpath/lib/Slicer-5.6/libvtkCommonCore-9.2.dylib
      change: @rpath/libCTK.dylib -> @rpath/lib/Slicer-5.6/libCTK.dylib
    package/Slicer.app/Contents/lib/Slicer-5.6/libvtksys-9.2.dylib
      id: @rpath/lib/Slicer-5.6/libvtksys-9.2.dylib
      add hint: @loader_path/../../
    package/Slicer.app/Contents/lib/Slicer-5.6/libCTK.dylib
      id: @rpath/lib/Slicer-5.6/libCTK.dylib
      add hint: @loader_path/../../
    package/Slicer.app/Contents/MacOS/Slicer
      delete hint: [ROOT]/build/Slicer-build/lib/Slicer-5.6
      add hint: @loader_path/../
      change: @rpath/libqSlicerApp.dylib -> @rpath/lib/Slicer-5.6/libqSlicerApp.dylib
    ");

    bundle.assert_closed();

    let executable = read_binary(&bundle.executable());
    assert_eq!(
        executable.dependencies,
        [
            "@rpath/lib/Slicer-5.6/libqSlicerApp.dylib",
            "/usr/lib/libSystem.B.dylib"
        ]
    );
    assert_eq!(executable.rpaths, ["@loader_path/../"]);
}

#[test]
fn fix_is_idempotent() {
    let mut bundle = TestBundle::slicer();
    fix_bundle(&bundle.platform(), &sequential()).unwrap();

    let platform = bundle.platform();
    let report = fix_bundle(&platform, &sequential()).unwrap();

    assert!(report.walk.copied.is_empty());
    assert_eq!(report.walk.already_present.len(), 3);
    assert!(report.patch.plans.is_empty());
    assert_eq!(bundle.writes(), 0);
    bundle.assert_closed();
}

/// A reference like `@rpath/lib/Slicer-5.6/libFoo.dylib` that is only found through the search
/// paths keeps its name, since it already matches the bundle layout.
#[test]
fn loader_relative_reference_from_search_path() {
    let mut bundle = TestBundle::new();
    let foo = bundle.build().join("Foo-build/lib/libFoo.dylib");
    write_binary(
        &bundle.executable(),
        None,
        &["@rpath/lib/Slicer-5.6/libFoo.dylib"],
        &[],
    );
    write_binary(
        &foo,
        Some(&foo.display().to_string()),
        &["/usr/lib/libc++.1.dylib"],
        &[],
    );
    bundle.search_paths = vec![bundle.build().join("Foo-build/lib")];

    let platform = bundle.platform();
    let report = fix_bundle(&platform, &sequential()).unwrap();

    let target = bundle.contents().join("lib/Slicer-5.6/libFoo.dylib");
    assert_eq!(report.walk.copied.len(), 1);
    assert_eq!(report.walk.copied[0].source, foo);
    assert_eq!(report.walk.copied[0].target, target);

    let executable = read_binary(&bundle.executable());
    assert_eq!(
        executable.dependencies,
        ["@rpath/lib/Slicer-5.6/libFoo.dylib"]
    );
    assert_eq!(executable.rpaths, ["@loader_path/../"]);

    let library = read_binary(&target);
    assert_eq!(
        library.install_id.as_deref(),
        Some("@rpath/lib/Slicer-5.6/libFoo.dylib")
    );
    assert_eq!(library.dependencies, ["/usr/lib/libc++.1.dylib"]);
    assert_eq!(library.rpaths, ["@loader_path/../../"]);
}

#[test]
fn dry_run_copies_without_rewriting() {
    let mut bundle = TestBundle::slicer();
    let platform = bundle.platform();

    let report = fix_bundle(
        &platform,
        &PatchOptions {
            dry_run: true,
            ..sequential()
        },
    )
    .unwrap();

    assert_eq!(report.walk.copied.len(), 3);
    assert_eq!(report.patch.plans.len(), 5);
    assert_eq!(report.patch.rewritten, 0);
    assert_eq!(bundle.writes(), 0);
    assert!(
        bundle
            .contents()
            .join("lib/Slicer-5.6/libvtksys-9.2.dylib")
            .is_file()
    );

    // Nothing was rewritten, so the same edits are still pending.
    let pending = verify_bundle(&platform).unwrap();
    assert_eq!(pending.plans, report.patch.plans);
}

#[test]
fn parallel_rewrites() {
    let mut bundle = TestBundle::slicer();
    let platform = bundle.platform();

    let report = fix_bundle(
        &platform,
        &PatchOptions {
            dry_run: false,
            concurrency: NonZeroUsize::new(4).unwrap(),
        },
    )
    .unwrap();

    assert_eq!(report.patch.rewritten, 5);
    assert_eq!(bundle.writes(), 5);
    bundle.assert_closed();

    let platform = bundle.platform();
    assert!(verify_bundle(&platform).unwrap().plans.is_empty());
}

#[test]
fn frameworks_are_copied_whole() {
    let mut bundle = TestBundle::new();
    let qt = bundle.root.path().join("Qt/lib");
    let framework = qt.join("QtCore.framework");
    write_binary(
        &bundle.executable(),
        None,
        &["@rpath/QtCore.framework/Versions/5/QtCore"],
        &[&qt.display().to_string()],
    );
    write_binary(
        &framework.join("Versions/5/QtCore"),
        Some("@rpath/QtCore.framework/Versions/5/QtCore"),
        &["/usr/lib/libc++.1.dylib"],
        &[],
    );
    fs_err::write(framework.join("Versions/5/Info.plist"), "plist").unwrap();
    fs_err::os::unix::fs::symlink("5", framework.join("Versions/Current")).unwrap();
    fs_err::os::unix::fs::symlink("Versions/Current/QtCore", framework.join("QtCore")).unwrap();

    let platform = bundle.platform();
    let report = fix_bundle(&platform, &sequential()).unwrap();

    let bundled = bundle.contents().join("Frameworks/QtCore.framework");
    assert_eq!(report.walk.copied.len(), 1);
    assert_eq!(report.walk.copied[0].source, framework.join("Versions/5/QtCore"));
    assert!(bundled.join("Versions/5/Info.plist").is_file());
    assert_eq!(
        fs_err::read_link(bundled.join("Versions/Current")).unwrap(),
        std::path::Path::new("5")
    );
    assert!(
        fs_err::symlink_metadata(bundled.join("QtCore"))
            .unwrap()
            .is_symlink()
    );

    // The top-level alias and the versioned binary are the same object.
    assert_eq!(report.patch.objects, 2);
    assert_eq!(report.patch.rewritten, 2);

    let executable = read_binary(&bundle.executable());
    assert_eq!(
        executable.dependencies,
        ["@rpath/Frameworks/QtCore.framework/Versions/5/QtCore"]
    );
    assert_eq!(executable.rpaths, ["@loader_path/../"]);

    let qt_core = read_binary(&bundled.join("Versions/5/QtCore"));
    assert_eq!(
        qt_core.install_id.as_deref(),
        Some("@rpath/Frameworks/QtCore.framework/Versions/5/QtCore")
    );
    assert_eq!(qt_core.rpaths, ["@loader_path/../../../../"]);
    bundle.assert_closed();

    // The original framework is untouched.
    let original = read_binary(&framework.join("Versions/5/QtCore"));
    assert_eq!(
        original.install_id.as_deref(),
        Some("@rpath/QtCore.framework/Versions/5/QtCore")
    );

    let platform = bundle.platform();
    let report = fix_bundle(&platform, &sequential()).unwrap();
    assert!(report.walk.copied.is_empty());
    assert!(report.patch.plans.is_empty());
}

/// Plugins on the allow-unresolved list may keep references to libraries outside of the bundle,
/// in both phases.
#[test]
fn allowed_unresolved_plugins_are_fixed() {
    let mut bundle = TestBundle::new();
    let plugin = bundle
        .contents()
        .join("lib/QtPlugins/sqldrivers/libqsqlpsql.dylib");
    write_binary(&bundle.executable(), None, &[], &["@loader_path/../"]);
    write_binary(
        &plugin,
        Some("@rpath/lib/QtPlugins/sqldrivers/libqsqlpsql.dylib"),
        &[
            "/usr/local/pgsql/lib/libpq.5.dylib",
            "/usr/lib/libSystem.B.dylib",
        ],
        &["@loader_path/../../../"],
    );
    bundle.libs = vec![plugin.clone()];

    let platform = bundle.platform();
    let report = fix_bundle(&platform, &sequential()).unwrap();

    assert!(report.walk.copied.is_empty());
    assert_eq!(report.patch.objects, 2);
    assert!(report.patch.plans.is_empty());
    assert_eq!(bundle.writes(), 0);
    assert_eq!(
        read_binary(&plugin).dependencies,
        [
            "/usr/local/pgsql/lib/libpq.5.dylib",
            "/usr/lib/libSystem.B.dylib"
        ]
    );
}
