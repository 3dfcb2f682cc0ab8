//! iNES (.nes) cartridge image parsing.
//!
//! 16-byte header: magic "NES" (byte 3 is conventionally $1A but only the
//! first three bytes are checked), PRG size in 16 KiB units, CHR size in
//! 8 KiB units, control bytes 6-7 carrying mirroring, battery, trainer,
//! four-screen and the mapper number nibbles. An optional 512-byte trainer
//! precedes the PRG data. See the iNES format description on the NESdev
//! wiki.

use std::fmt;
use std::fs::File;
use std::io::Read;

use crate::bits::flags::FlagReg;
use crate::cartridge::Mirroring;
use crate::diag;

// control byte 1
const RCTL1_VERTICAL: u32 = 0x01;
const RCTL1_BATTERY: u32 = 0x02;
const RCTL1_TRAINER: u32 = 0x04;
const RCTL1_FOURSCREEN: u32 = 0x08;
const RCTL1_MAPPER_LOW: u32 = 0xF0;
// control byte 2
const RCTL2_MAPPER_HIGH: u32 = 0xF0;

pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;

/// Loading failed; no partial cartridge state is produced.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    BadSignature,
    /// The header promises more PRG/CHR/trainer data than the file holds.
    Truncated,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "cannot read ROM: {e}"),
            LoadError::BadSignature => write!(f, "invalid iNES signature"),
            LoadError::Truncated => write!(f, "ROM file is incomplete"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// A parsed cartridge: PRG/CHR images plus board wiring.
pub struct Cartridge {
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    /// 512-byte trainer block, kept but unused.
    pub trainer: Option<Vec<u8>>,
}

impl Cartridge {
    /// Read and parse an iNES file.
    pub fn load(path: &str) -> Result<Self, LoadError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let cart = Self::parse(&data)?;
        diag::info(&format!(
            "{path} loaded: {} PRG banks, {} CHR banks, mapper {}, {:?} mirroring",
            cart.prg.len() / PRG_UNIT,
            cart.chr.len() / CHR_UNIT,
            cart.mapper,
            cart.mirroring,
        ));
        Ok(cart)
    }

    /// Parse an iNES image held in memory.
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < 16 {
            return Err(LoadError::Truncated);
        }
        if &data[0..3] != b"NES" {
            return Err(LoadError::BadSignature);
        }

        let prg_count = data[4] as usize;
        let chr_count = data[5] as usize;
        let ctrl1 = FlagReg::<8>::new(data[6] as u32);
        let ctrl2 = FlagReg::<8>::new(data[7] as u32);

        let mapper = (ctrl1.select(RCTL1_MAPPER_LOW) | (ctrl2.select(RCTL2_MAPPER_HIGH) << 4)) as u8;
        let mirroring = if ctrl1.test(RCTL1_FOURSCREEN) {
            Mirroring::FourScreen
        } else if ctrl1.test(RCTL1_VERTICAL) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut offset = 16;
        let trainer = if ctrl1.test(RCTL1_TRAINER) {
            let end = offset + 512;
            if data.len() < end {
                return Err(LoadError::Truncated);
            }
            offset = end;
            Some(data[end - 512..end].to_vec())
        } else {
            None
        };

        let prg_end = offset + prg_count * PRG_UNIT;
        if data.len() < prg_end {
            return Err(LoadError::Truncated);
        }
        let prg = data[offset..prg_end].to_vec();

        let chr_end = prg_end + chr_count * CHR_UNIT;
        if data.len() < chr_end {
            return Err(LoadError::Truncated);
        }
        let chr = if chr_count > 0 {
            data[prg_end..chr_end].to_vec()
        } else {
            vec![0; CHR_UNIT] // no CHR ROM: 8 KiB of CHR RAM
        };

        Ok(Self { prg, chr, mapper, mirroring, battery: ctrl1.test(RCTL1_BATTERY), trainer })
    }
}
