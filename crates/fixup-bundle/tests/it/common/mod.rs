use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_fs::TempDir;
use fs_err as fs;

use fixup_bundle::{
    BundleContext, BundleLayout, DarwinPlatform, PlatformOptions, RewritePlan,
};
use fixup_macho::{InstallNameEdits, LoadCommandReader, LoadCommandWriter, LoadCommands};

/// The magic number of a little-endian 64-bit Mach-O binary.
pub(crate) const MAGIC: [u8; 4] = [0xcf, 0xfa, 0xed, 0xfe];

/// Write a fake binary: the Mach-O magic number followed by its load commands as text.
pub(crate) fn write_binary(path: &Path, id: Option<&str>, dependencies: &[&str], rpaths: &[&str]) {
    write_commands(
        path,
        &LoadCommands {
            install_id: id.map(ToString::to_string),
            dependencies: dependencies.iter().map(ToString::to_string).collect(),
            rpaths: rpaths.iter().map(ToString::to_string).collect(),
        },
    );
}

fn write_commands(path: &Path, commands: &LoadCommands) {
    let mut contents = String::from("\n");
    if let Some(id) = &commands.install_id {
        writeln!(contents, "id {id}").unwrap();
    }
    for dependency in &commands.dependencies {
        writeln!(contents, "dep {dependency}").unwrap();
    }
    for rpath in &commands.rpaths {
        writeln!(contents, "rpath {rpath}").unwrap();
    }

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut bytes = MAGIC.to_vec();
    bytes.extend(contents.as_bytes());
    fs::write(path, bytes).unwrap();
}

/// Returns `true` if the path is a file that starts with the Mach-O magic number.
pub(crate) fn is_binary(path: &Path) -> bool {
    path.is_file() && fs::read(path).unwrap().starts_with(&MAGIC)
}

/// Read the load commands of a fake binary.
pub(crate) fn read_binary(path: &Path) -> LoadCommands {
    let bytes = fs::read(path).unwrap();
    assert_eq!(bytes[..4], MAGIC, "{} is not a binary", path.display());
    let contents = String::from_utf8(bytes[4..].to_vec()).unwrap();

    let mut commands = LoadCommands::default();
    for line in contents.lines() {
        if let Some(id) = line.strip_prefix("id ") {
            commands.install_id = Some(id.to_string());
        } else if let Some(dependency) = line.strip_prefix("dep ") {
            commands.dependencies.push(dependency.to_string());
        } else if let Some(rpath) = line.strip_prefix("rpath ") {
            commands.rpaths.push(rpath.to_string());
        }
    }
    commands
}

fn tool_failed(path: &Path, stderr: String) -> fixup_macho::Error {
    fixup_macho::Error::ToolFailed {
        tool: "install_name_tool".to_string(),
        path: path.to_path_buf(),
        stderr,
    }
}

/// Reads the load commands written by [`write_binary`].
pub(crate) struct FakeReader;

impl LoadCommandReader for FakeReader {
    fn read(&self, path: &Path) -> Result<LoadCommands, fixup_macho::Error> {
        Ok(read_binary(path))
    }
}

/// Applies edits to binaries written by [`write_binary`], like `install_name_tool` would.
pub(crate) struct FakeWriter {
    pub(crate) writes: Arc<AtomicUsize>,
}

impl LoadCommandWriter for FakeWriter {
    fn write(&self, path: &Path, edits: &InstallNameEdits) -> Result<(), fixup_macho::Error> {
        let mut commands = read_binary(path);

        if let Some(id) = &edits.id {
            commands.install_id = Some(id.clone());
        }
        for rpath in &edits.delete_rpaths {
            let Some(index) = commands.rpaths.iter().position(|existing| existing == rpath) else {
                return Err(tool_failed(path, format!("no LC_RPATH load command with path: {rpath}")));
            };
            commands.rpaths.remove(index);
        }
        for rpath in &edits.add_rpaths {
            if commands.rpaths.contains(rpath) {
                return Err(tool_failed(path, format!("would duplicate path, file already has LC_RPATH for: {rpath}")));
            }
            commands.rpaths.push(rpath.clone());
        }
        for (old, new) in &edits.changes {
            for dependency in &mut commands.dependencies {
                if dependency == old {
                    dependency.clone_from(new);
                }
            }
        }

        write_commands(path, &commands);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A build tree and an application bundle in a temporary directory.
pub(crate) struct TestBundle {
    pub(crate) root: TempDir,
    pub(crate) libs: Vec<PathBuf>,
    pub(crate) search_paths: Vec<PathBuf>,
    pub(crate) options: PlatformOptions,
    writes: Arc<AtomicUsize>,
}

impl TestBundle {
    pub(crate) fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            libs: Vec::new(),
            search_paths: Vec::new(),
            options: PlatformOptions::default(),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An executable and an installed library that reference libraries from three build trees.
    ///
    /// Fixing it copies `libvtkCommonCore`, `libvtksys` and `libCTK` into the bundle.
    pub(crate) fn slicer() -> Self {
        let mut bundle = Self::new();
        let build = bundle.build();
        let lib_dir = bundle.contents().join("lib/Slicer-5.6");

        write_binary(
            &bundle.executable(),
            None,
            &["@rpath/libqSlicerApp.dylib", "/usr/lib/libSystem.B.dylib"],
            &[&bundle.build_ref("Slicer-build/lib/Slicer-5.6")],
        );
        write_binary(
            &lib_dir.join("libqSlicerApp.dylib"),
            Some(&bundle.build_ref("Slicer-build/lib/Slicer-5.6/libqSlicerApp.dylib")),
            &[
                &bundle.build_ref("VTK-build/lib/libvtkCommonCore-9.2.dylib"),
                "@rpath/libCTK.dylib",
            ],
            &[&bundle.build_ref("CTK-build/lib")],
        );
        write_binary(
            &build.join("VTK-build/lib/libvtkCommonCore-9.2.dylib"),
            Some(&bundle.build_ref("VTK-build/lib/libvtkCommonCore-9.2.dylib")),
            &["@rpath/libvtksys-9.2.dylib", "/usr/lib/libc++.1.dylib"],
            &[],
        );
        write_binary(
            &build.join("VTK-build/lib/libvtksys-9.2.dylib"),
            Some(&bundle.build_ref("VTK-build/lib/libvtksys-9.2.dylib")),
            &[],
            &[],
        );
        write_binary(
            &build.join("CTK-build/lib/libCTK.dylib"),
            Some("@rpath/libCTK.dylib"),
            &[],
            &[],
        );

        bundle.libs = vec![lib_dir.join("libqSlicerApp.dylib")];
        bundle.search_paths = vec![build.join("VTK-build/lib")];
        bundle
    }

    /// The root of the build trees.
    pub(crate) fn build(&self) -> PathBuf {
        self.root.path().join("build")
    }

    pub(crate) fn app(&self) -> PathBuf {
        self.root.path().join("package").join("Slicer.app")
    }

    pub(crate) fn contents(&self) -> PathBuf {
        self.app().join("Contents")
    }

    pub(crate) fn executable(&self) -> PathBuf {
        self.contents().join("MacOS").join("Slicer")
    }

    /// A path in the build trees, rendered as a reference.
    pub(crate) fn build_ref(&self, relative: &str) -> String {
        self.build().join(relative).display().to_string()
    }

    pub(crate) fn context(&self) -> BundleContext {
        BundleContext {
            app_name: "Slicer".to_string(),
            app_dir: self.app(),
            build_roots: vec![self.build().join("Slicer-build"), self.build()],
            libs: self.libs.clone(),
            search_paths: self.search_paths.clone(),
            layout: BundleLayout {
                lib_dir: "lib/Slicer-5.6".to_string(),
                itk_factories_dir: "lib/Slicer-5.6/ITKFactories".to_string(),
                qt_modules_dir: "lib/Slicer-5.6/qt-loadable-modules".to_string(),
                qt_plugins_dir: "lib/QtPlugins".to_string(),
                cli_modules_dir: "lib/Slicer-5.6/cli-modules".to_string(),
                python_stdlib_dir: "lib/python3.9".to_string(),
                python_sitepackages_dir: "lib/python3.9/site-packages".to_string(),
            },
        }
    }

    /// A fresh platform for a run, with its own rewrite counter.
    pub(crate) fn platform(&mut self) -> DarwinPlatform {
        self.writes = Arc::new(AtomicUsize::new(0));
        DarwinPlatform::with_tools(
            self.context(),
            &self.options,
            Box::new(FakeReader),
            Box::new(FakeWriter {
                writes: self.writes.clone(),
            }),
        )
        .unwrap()
    }

    /// The number of rewrites since the last call to [`TestBundle::platform`].
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every non-system reference of every binary in the bundle resolves to a file in it.
    pub(crate) fn assert_closed(&self) {
        for entry in walkdir::WalkDir::new(self.app()) {
            let entry = entry.unwrap();
            if !is_binary(entry.path()) {
                continue;
            }
            for dependency in read_binary(entry.path()).dependencies {
                if fixup_bundle::Classifier::is_system(&dependency) {
                    continue;
                }
                let Some(rest) = dependency.strip_prefix("@rpath/") else {
                    panic!("{} references `{dependency}`", entry.path().display());
                };
                assert!(
                    self.contents().join(rest).is_file(),
                    "{} references missing `{dependency}`",
                    entry.path().display()
                );
            }
        }
    }

    /// Render rewrite plans with paths relative to the temporary directory.
    pub(crate) fn render(&self, plans: &[RewritePlan]) -> String {
        let mut output = String::new();
        for plan in plans {
            let object = plan.object.strip_prefix(self.root.path()).unwrap();
            writeln!(output, "{}", object.display()).unwrap();
            if let Some(id) = &plan.edits.set_id {
                writeln!(output, "  id: {id}").unwrap();
            }
            for hint in &plan.edits.delete_hints {
                writeln!(output, "  delete hint: {hint}").unwrap();
            }
            for hint in &plan.edits.add_hints {
                writeln!(output, "  add hint: {hint}").unwrap();
            }
            for (old, new) in &plan.edits.change_references {
                writeln!(output, "  change: {old} -> {new}").unwrap();
            }
        }
        output.replace(&self.root.path().display().to_string(), "[ROOT]")
    }
}
