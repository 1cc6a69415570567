//! Mach-O header and load command parsing
//!
//! Only the structure needed to reach the code signature is decoded: the
//! fixed 32-byte header region, the load command table, and the first slice
//! of a FAT binary.

use goblin::mach::fat::{FAT_CIGAM, FAT_MAGIC, SIZEOF_FAT_HEADER};
use goblin::mach::header::{MH_MAGIC, MH_MAGIC_64};
use goblin::mach::load_command::LC_CODE_SIGNATURE;
use tracing::{debug, warn};

use crate::reader::{ByteReader, Endian, WordStruct};
use crate::{Error, Result};

/// Byte order of the Mach-O header and load commands.
pub const LOAD_COMMAND_ENDIAN: Endian = Endian::Little;

/// Size of the header region; load commands start right after it.
///
/// The 64-bit header size is used for every image.
pub const HEADER_SIZE: usize = 32;

/// Smallest valid `cmdsize` (cmd + cmdsize).
const MIN_CMDSIZE: u32 = 8;

/// Mach-O header fields, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader {
    pub magic: u32,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

impl WordStruct for MachHeader {
    const WORDS: usize = 7;

    fn from_words(words: &[u32]) -> Self {
        Self {
            magic: words[0],
            cputype: words[1],
            cpusubtype: words[2],
            filetype: words[3],
            ncmds: words[4],
            sizeofcmds: words[5],
            flags: words[6],
        }
    }
}

/// A load command viewed through the `linkedit_data_command` layout.
///
/// `dataoff`/`datasize` are only meaningful for linkedit commands such as
/// `LC_CODE_SIGNATURE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCommand {
    pub cmd: u32,
    pub cmdsize: u32,
    pub dataoff: u32,
    pub datasize: u32,
}

impl WordStruct for LoadCommand {
    const WORDS: usize = 4;

    fn from_words(words: &[u32]) -> Self {
        Self {
            cmd: words[0],
            cmdsize: words[1],
            dataoff: words[2],
            datasize: words[3],
        }
    }
}

/// First-architecture entry of a FAT header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatArch {
    pub offset: u32,
    pub size: u32,
}

/// Check the big-endian magic for a FAT (universal) binary.
pub fn is_fat(data: &[u8]) -> Result<bool> {
    let magic = ByteReader::new(data).read_u32(0, Endian::Big)?;
    Ok(magic == FAT_MAGIC || magic == FAT_CIGAM)
}

/// Read the first `fat_arch` entry.
///
/// `offset` and `size` sit at bytes 8 and 12 of the entry and are big-endian.
pub fn first_fat_arch(data: &[u8]) -> Result<FatArch> {
    let reader = ByteReader::new(data);
    let arch = SIZEOF_FAT_HEADER;
    Ok(FatArch {
        offset: reader.read_u32(arch + 8, Endian::Big)?,
        size: reader.read_u32(arch + 12, Endian::Big)?,
    })
}

/// Slice out the first architecture of a FAT binary.
///
/// Other architectures are not considered.
pub fn first_fat_slice(data: &[u8]) -> Result<&[u8]> {
    let arch = first_fat_arch(data)?;
    debug!(
        "FAT binary, selecting first slice at {:#x} ({} bytes)",
        arch.offset, arch.size
    );
    ByteReader::new(data).bytes(arch.offset as usize, arch.size as usize)
}

/// A thin (single-architecture) Mach-O image.
#[derive(Debug, Clone, Copy)]
pub struct MachOFile<'a> {
    reader: ByteReader<'a>,
    header: MachHeader,
}

impl<'a> MachOFile<'a> {
    /// Read the header of a thin image.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let reader = ByteReader::new(data);
        let header: MachHeader = reader.read_struct(0, LOAD_COMMAND_ENDIAN)?;

        if header.magic != MH_MAGIC && header.magic != MH_MAGIC_64 {
            warn!("unexpected Mach-O magic {:#010x}, parsing anyway", header.magic);
        }
        debug!(
            "Mach-O header: cputype {:#x}, filetype {}, {} load commands",
            header.cputype, header.filetype, header.ncmds
        );

        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &MachHeader {
        &self.header
    }

    pub fn data(&self) -> &'a [u8] {
        self.reader.data()
    }

    /// Iterate the load command table.
    pub fn load_commands(&self) -> LoadCommands<'a> {
        LoadCommands {
            reader: self.reader,
            offset: HEADER_SIZE,
            remaining: self.header.ncmds,
        }
    }

    /// Find `LC_CODE_SIGNATURE`. `None` means the image is unsigned.
    pub fn find_code_signature(&self) -> Result<Option<LoadCommand>> {
        for command in self.load_commands() {
            let (offset, command) = command?;
            if command.cmd == LC_CODE_SIGNATURE {
                debug!(
                    "LC_CODE_SIGNATURE at {:#x}: dataoff {:#x}, datasize {}",
                    offset, command.dataoff, command.datasize
                );
                return Ok(Some(command));
            }
        }
        Ok(None)
    }

    /// The code signature bytes named by `command`.
    ///
    /// The range is `[dataoff, dataoff + datasize + 1)`, clamped to the end
    /// of the image.
    pub fn signature_region(&self, command: &LoadCommand) -> Result<&'a [u8]> {
        let data = self.reader.data();
        let start = command.dataoff as usize;
        if start > data.len() {
            return Err(Error::Truncated {
                offset: u64::from(command.dataoff),
                len: u64::from(command.datasize),
                available: data.len(),
            });
        }
        let end = start
            .saturating_add(command.datasize as usize)
            .saturating_add(1)
            .min(data.len());
        Ok(&data[start..end])
    }
}

/// Iterator over load commands, yielding each command's file offset.
///
/// The cursor advances by each command's own `cmdsize`.
#[derive(Debug, Clone)]
pub struct LoadCommands<'a> {
    reader: ByteReader<'a>,
    offset: usize,
    remaining: u32,
}

impl Iterator for LoadCommands<'_> {
    type Item = Result<(usize, LoadCommand)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let offset = self.offset;
        let command: LoadCommand = match self.reader.read_struct(offset, LOAD_COMMAND_ENDIAN) {
            Ok(command) => command,
            Err(e) => {
                self.remaining = 0;
                return Some(Err(e));
            }
        };

        if command.cmdsize < MIN_CMDSIZE {
            self.remaining = 0;
            return Some(Err(Error::MachO(format!(
                "load command {:#x} at {:#x} has cmdsize {}",
                command.cmd, offset, command.cmdsize
            ))));
        }

        self.remaining -= 1;
        self.offset = offset.saturating_add(command.cmdsize as usize);
        Some(Ok((offset, command)))
    }
}
