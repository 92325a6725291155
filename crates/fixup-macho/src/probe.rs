use std::io::{self, Read};
use std::path::Path;

use fs_err as fs;
use goblin::mach::header::{MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64};

/// Returns `true` if the first four bytes are a thin Mach-O magic number, in either byte order.
pub fn is_macho_magic(bytes: [u8; 4]) -> bool {
    matches!(
        u32::from_be_bytes(bytes),
        MH_MAGIC | MH_CIGAM | MH_MAGIC_64 | MH_CIGAM_64
    )
}

/// Check if a file is a Mach-O binary by examining its magic bytes.
///
/// Missing files and files shorter than four bytes are not binaries. Symbolic links are
/// followed.
pub fn is_macho_file(path: &Path) -> io::Result<bool> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(is_macho_magic(magic)),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}
