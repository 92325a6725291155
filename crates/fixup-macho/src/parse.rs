use std::path::Path;

use fs_err as fs;
use goblin::mach::{Mach, MachO};
use itertools::Itertools;
use tracing::trace;

use fixup_fs::Simplified;

use crate::{Error, LoadCommandReader, LoadCommands};

/// Reads load commands by parsing the binary in-process.
///
/// Universal binaries are merged across their architectures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

impl LoadCommandReader for Native {
    fn read(&self, path: &Path) -> Result<LoadCommands, Error> {
        trace!("Parsing load commands of {}", path.simplified_display());
        let data = fs::read(path)?;
        parse_macho_bytes(&data).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Parse the load commands from the bytes of a thin or universal Mach-O binary.
pub fn parse_macho_bytes(data: &[u8]) -> Result<LoadCommands, String> {
    let mach = Mach::parse(data).map_err(|err| err.to_string())?;

    match mach {
        Mach::Binary(macho) => Ok(parse_single_macho(&macho)),
        Mach::Fat(fat) => {
            let mut install_id = None;
            let mut dependencies = Vec::new();
            let mut rpaths = Vec::new();

            for arch in fat.iter_arches() {
                let arch = arch.map_err(|err| err.to_string())?;
                let start = arch.offset as usize;
                let end = start + arch.size as usize;
                let slice = data
                    .get(start..end)
                    .ok_or_else(|| format!("Architecture slice {start}..{end} is out of bounds"))?;
                let macho = MachO::parse(slice, 0).map_err(|err| err.to_string())?;

                let parsed = parse_single_macho(&macho);
                install_id = install_id.or(parsed.install_id);
                dependencies.extend(parsed.dependencies);
                rpaths.extend(parsed.rpaths);
            }

            Ok(LoadCommands {
                install_id,
                dependencies: dependencies.into_iter().unique().collect(),
                rpaths: rpaths.into_iter().unique().collect(),
            })
        }
    }
}

fn parse_single_macho(macho: &MachO) -> LoadCommands {
    LoadCommands {
        install_id: macho.name.map(ToString::to_string),
        // The first entry is a placeholder for the binary itself.
        dependencies: macho
            .libs
            .iter()
            .skip(1)
            .map(|lib| (*lib).to_string())
            .unique()
            .collect(),
        rpaths: macho
            .rpaths
            .iter()
            .map(|rpath| (*rpath).to_string())
            .unique()
            .collect(),
    }
}
