//! NES PPU: registers, VRAM, OAM, and the scanline renderer.
//!
//! One `end_scanline` call advances the frame state machine by a single
//! scanline: visible lines composite background and sprites into the frame
//! buffer, line 241 raises vblank (and the NMI request when enabled) and
//! presents the frame, the last line closes the frame and wraps. Scroll
//! state lives in the two 15-bit address registers `v`/`t` reconstructed
//! from the $2005/$2006 write protocol.

use crate::bits::field::BitField;
use crate::bits::flags::FlagReg;
use crate::cartridge::Mirroring;
use crate::diag;
use crate::ppu::Screen;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

/// Scanline numbering: 0-239 visible, 240 idle, 241 vblank start,
/// 242-260 vblank, 261 pre-render/frame end.
pub const SCANLINE_VBLANK: u32 = 241;
pub const SCANLINE_LAST: u32 = 261;

// $2002 status bits
pub const STATUS_VBLANK: u32 = 0x80;
pub const STATUS_SPRITE0_HIT: u32 = 0x40;
pub const STATUS_OVERFLOW: u32 = 0x20;
pub const STATUS_WRITE_IGNORED: u32 = 0x10;

// $2000 control 1
pub const CTL1_NMI: u32 = 0x80;
pub const CTL1_SPRITE_8X16: u32 = 0x20;
pub const CTL1_BG_PATTERN: u32 = 0x10;
pub const CTL1_SPR_PATTERN: u32 = 0x08;
pub const CTL1_INCREMENT_32: u32 = 0x04;
pub const CTL1_NAMETABLE: u32 = 0x03;

// $2001 control 2 / mask
pub const CTL2_EMPHASIS: u32 = 0xE0;
pub const CTL2_SPR_VISIBLE: u32 = 0x10;
pub const CTL2_BG_VISIBLE: u32 = 0x08;
/// Show sprites in the left 8-pixel column (clear = clipped).
pub const CTL2_SPR_LEFT: u32 = 0x04;
/// Show background in the left 8-pixel column (clear = clipped).
pub const CTL2_BG_LEFT: u32 = 0x02;
pub const CTL2_MONO: u32 = 0x01;

// 15-bit VRAM address / scroll register fields
pub const VADDR_COARSE_X: u32 = 0x001F;
pub const VADDR_COARSE_Y: u32 = 0x03E0;
pub const VADDR_NT_H: u32 = 0x0400;
pub const VADDR_NT_V: u32 = 0x0800;
pub const VADDR_NT: u32 = 0x0C00;
pub const VADDR_FINE_Y: u32 = 0x7000;
/// $2006 staging fields: first write fills the high part, second the low.
pub const VADDR_HIGH: u32 = 0x7F00;
pub const VADDR_LOW: u32 = 0x00FF;

// 14-bit VRAM bus address fields
const VRAM_BANK: u32 = 0x3000;
const VRAM_BANK_OFFSET: u32 = 0x0FFF;

// OAM attribute bits
const ATTR_FLIP_V: u8 = 0x80;
const ATTR_FLIP_H: u8 = 0x40;
const ATTR_BEHIND: u8 = 0x20;
const ATTR_PALETTE: u8 = 0x03;

/// 2C02 palette from the original 64-entry RGB table (0xRRGGBB).
#[rustfmt::skip]
pub const PALETTE_RGB: [u32; 64] = [
    0x757575, 0x271B8F, 0x0000AB, 0x47009F, 0x8F0077, 0xAB0013, 0xA70000, 0x7F0B00,
    0x432F00, 0x004700, 0x005100, 0x003F17, 0x1B3F5F, 0x000000, 0x000000, 0x000000,
    0xBCBCBC, 0x0073EF, 0x233BEF, 0x8300F3, 0xBF00BF, 0xE7005B, 0xDB2B00, 0xCB4F0F,
    0x8B7300, 0x009700, 0x00AB00, 0x00933B, 0x00838B, 0x000000, 0x000000, 0x000000,
    0xFFFFFF, 0x3FBFFF, 0x5F97FF, 0xA78BFD, 0xF77BFF, 0xFF77B7, 0xFF7763, 0xFF9B3B,
    0xF3BF3F, 0x83D313, 0x4FDF4B, 0x58F898, 0x00EBDB, 0x000000, 0x000000, 0x000000,
    0xFFFFFF, 0xABE7FF, 0xC7D7FF, 0xD7CBFF, 0xFFC7FF, 0xFFC7DB, 0xFFBFB3, 0xFFDBAB,
    0xFFE7A3, 0xE3FFA3, 0xABF3BF, 0xB3FFCF, 0x9FFFF3, 0x000000, 0x000000, 0x000000,
];

/// PPU state: registers, VRAM, OAM, frame buffer, scanline counter.
pub struct Ppu {
    pub control1: FlagReg<8>,
    pub control2: FlagReg<8>,
    pub status: FlagReg<8>,
    /// Live VRAM address; doubles as the rendering scroll position.
    v: FlagReg<15>,
    /// Scroll-reload register, staged by the $2005/$2006 protocols.
    t: FlagReg<15>,
    fine_x: BitField<3>,
    oam_addr: BitField<8>,
    /// $2007 read buffer: non-palette reads return the previous fetch.
    latch: u8,
    /// Shared $2005/$2006 first/second-write toggle; $2002 reads reset it.
    first_write: bool,

    pattern: [u8; 0x2000],
    nametables: [u8; 0x1000],
    palette: [u8; 32],
    oam: [u8; 256],
    mirroring: Mirroring,

    pub framebuffer: [u32; WIDTH * HEIGHT],
    scanline: u32,
    pub frame: u64,
    /// Sprite-0 hit already latched this frame.
    hit_this_frame: bool,
    nmi_request: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            control1: FlagReg::default(),
            control2: FlagReg::default(),
            status: FlagReg::default(),
            v: FlagReg::default(),
            t: FlagReg::default(),
            fine_x: BitField::default(),
            oam_addr: BitField::default(),
            latch: 0,
            first_write: true,
            pattern: [0; 0x2000],
            nametables: [0; 0x1000],
            palette: [0; 32],
            oam: [0; 256],
            mirroring: Mirroring::Horizontal,
            framebuffer: [0; WIDTH * HEIGHT],
            scanline: 0,
            frame: 0,
            hit_this_frame: false,
            nmi_request: false,
        }
    }

    pub fn reset(&mut self) {
        self.control1.clear_all();
        self.control2.clear_all();
        self.status.clear_all();
        self.v.clear_all();
        self.t.clear_all();
        self.fine_x.set_zero();
        self.oam_addr.set_zero();
        self.latch = 0;
        self.first_write = true;
        self.pattern = [0; 0x2000];
        self.nametables = [0; 0x1000];
        self.palette = [0; 32];
        self.oam = [0; 256];
        self.framebuffer = [0; WIDTH * HEIGHT];
        self.scanline = 0;
        self.frame = 0;
        self.hit_this_frame = false;
        self.nmi_request = false;
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    pub fn scanline(&self) -> u32 {
        self.scanline
    }

    /// Consume a pending NMI request.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_request)
    }

    /// Fill one 1 KiB pattern-table bank from CHR data (MMC bank switch).
    pub fn load_pattern_bank(&mut self, bank: usize, data: &[u8]) {
        debug_assert!(bank < 8 && data.len() == 0x400);
        self.pattern[bank * 0x400..(bank + 1) * 0x400].copy_from_slice(data);
    }

    // ---- VRAM mirroring ----

    /// Collapse the nametable-select bits per the cartridge wiring.
    fn mirror_nametable(&self, addr: &mut FlagReg<14>) {
        match self.mirroring {
            Mirroring::Horizontal => addr.clear(VADDR_NT_H),
            Mirroring::Vertical => addr.clear(VADDR_NT_V),
            Mirroring::SingleScreen => addr.clear(VADDR_NT),
            Mirroring::FourScreen => {}
        }
    }

    /// Map a VRAM bus address onto backing storage. A projection:
    /// `mirror(mirror(a)) == mirror(a)`.
    pub fn mirror(&self, addr: u16) -> u16 {
        let mut v = FlagReg::<14>::new((addr & 0x3FFF) as u32);
        match v.select(VRAM_BANK) {
            // pattern tables, untouched
            0 | 1 => {}
            2 => self.mirror_nametable(&mut v),
            3 => {
                if v.query(VRAM_BANK_OFFSET) < 0xF00 {
                    v.update(VRAM_BANK, 2);
                    self.mirror_nametable(&mut v);
                } else {
                    // palette: 32 entries; the sprite "transparent" slots
                    // alias their background counterparts
                    let mut pal = v.value() & 0x3F1F;
                    if pal & 0x03 == 0 {
                        pal &= !0x10;
                    }
                    return pal as u16;
                }
            }
            _ => unreachable!(),
        }
        v.value() as u16
    }

    fn vram_read(&self, addr: u16) -> u8 {
        let addr = self.mirror(addr);
        match addr {
            0x0000..=0x1FFF => self.pattern[addr as usize],
            0x2000..=0x2FFF => self.nametables[(addr - 0x2000) as usize],
            0x3F00..=0x3F1F => self.palette[(addr & 0x1F) as usize],
            _ => unreachable!("mirror() produced ${addr:04X}"),
        }
    }

    fn vram_write(&mut self, addr: u16, value: u8) {
        let addr = self.mirror(addr);
        match addr {
            // pattern range is writable for CHR-RAM boards
            0x0000..=0x1FFF => self.pattern[addr as usize] = value,
            0x2000..=0x2FFF => self.nametables[(addr - 0x2000) as usize] = value,
            0x3F00..=0x3F1F => self.palette[(addr & 0x1F) as usize] = value & 0x3F,
            _ => unreachable!("mirror() produced ${addr:04X}"),
        }
    }

    // ---- register ports ($2000-$2007, mirrored) ----

    /// CPU read of a PPU port. Reads of write-only ports are reported and
    /// return the data latch.
    pub fn read_port(&mut self, addr: u16) -> u8 {
        match addr & 0x2007 {
            0x2002 => self.read_status(),
            0x2004 => self.oam[self.oam_addr.value() as usize], // no increment on read
            0x2007 => self.read_data(),
            port => {
                diag::warn(&format!("read of write-only PPU port ${port:04X}"));
                self.latch
            }
        }
    }

    /// CPU write to a PPU port. Writes to $2002 are reported and dropped.
    pub fn write_port(&mut self, addr: u16, data: u8) {
        match addr & 0x2007 {
            0x2000 => {
                self.control1.load(data as u32);
                // base nametable select lands in the scroll-reload register
                self.t.update(VADDR_NT, data as u32 & CTL1_NAMETABLE);
            }
            0x2001 => self.control2.load(data as u32),
            0x2003 => self.oam_addr.set(data as u32),
            0x2004 => {
                self.oam[self.oam_addr.value() as usize] = data;
                self.oam_addr.inc();
            }
            0x2005 => self.write_scroll(data),
            0x2006 => self.write_address(data),
            0x2007 => self.write_data(data),
            port => diag::warn(&format!("write to read-only PPU port ${port:04X}")),
        }
    }

    /// $2002: returns status, clears vblank, resets the write toggle.
    fn read_status(&mut self) -> u8 {
        let value = self.status.value() as u8;
        self.status.clear(STATUS_VBLANK);
        // $2005 and $2006 share the first/second-write toggle
        self.first_write = true;
        value
    }

    /// $2005: first write is fine X plus coarse X, second is fine Y plus
    /// coarse Y, all staged into `t`.
    fn write_scroll(&mut self, data: u8) {
        let data = data as u32;
        if self.first_write {
            self.fine_x = BitField::wrap(data & 7);
            self.t.update(VADDR_COARSE_X, data >> 3);
        } else {
            self.t.update(VADDR_FINE_Y, data & 7);
            self.t.update(VADDR_COARSE_Y, data >> 3);
        }
        self.first_write = !self.first_write;
    }

    /// $2006: first write stages the high 6 address bits (bits 2-3 of the
    /// byte are the nametable select), second sets the low byte and copies
    /// the assembled address into the live register.
    fn write_address(&mut self, data: u8) {
        if self.first_write {
            self.t.update(VADDR_HIGH, data as u32 & 0x3F);
        } else {
            self.t.update(VADDR_LOW, data as u32);
            self.v = self.t;
        }
        self.first_write = !self.first_write;
    }

    /// Current VRAM pointer, post-incremented by 1 or 32 per control 1.
    fn advance_address(&mut self) -> u16 {
        let addr = (self.v.value() & 0x3FFF) as u16;
        let step = if self.control1.test(CTL1_INCREMENT_32) { 32 } else { 1 };
        self.v.load(self.v.value().wrapping_add(step));
        addr
    }

    /// $2007 read: buffered below the palette range (returns the previous
    /// fetch), immediate for palette entries.
    fn read_data(&mut self) -> u8 {
        let addr = self.advance_address();
        if self.mirror(addr) < 0x3F00 {
            let value = self.latch;
            self.latch = self.vram_read(addr);
            value
        } else {
            self.vram_read(addr)
        }
    }

    /// $2007 write.
    fn write_data(&mut self, data: u8) {
        let addr = self.advance_address();
        self.vram_write(addr, data);
    }

    /// OAM DMA ($4014): one full page into sprite memory.
    pub fn oam_dma(&mut self, page: &[u8; 256]) {
        self.oam.copy_from_slice(page);
    }

    // ---- frame state machine ----

    /// Advance one scanline. Returns true when the frame wrapped.
    pub fn end_scanline(&mut self, screen: &mut dyn Screen) -> bool {
        if self.scanline == 0 {
            self.begin_frame();
        }
        match self.scanline {
            0..=239 => self.render_scanline(self.scanline),
            240 => {} // idle line before vblank
            SCANLINE_VBLANK => {
                self.status.set(STATUS_VBLANK);
                screen.blit(&self.framebuffer, WIDTH, HEIGHT);
                if self.control1.test(CTL1_NMI) {
                    self.nmi_request = true;
                }
            }
            242..=260 => {} // vblank continues
            SCANLINE_LAST => {
                self.status.clear(STATUS_VBLANK | STATUS_SPRITE0_HIT | STATUS_OVERFLOW);
                self.hit_this_frame = false;
                self.frame += 1;
                self.scanline = 0;
                return true;
            }
            _ => unreachable!(),
        }
        self.scanline += 1;
        false
    }

    /// Frame start: reload the scroll position and invalidate the buffer.
    fn begin_frame(&mut self) {
        if self.control2.test(CTL2_BG_VISIBLE) {
            self.v = self.t;
        }
        self.status.clear(STATUS_WRITE_IGNORED);
        self.framebuffer = [0; WIDTH * HEIGHT];
    }

    fn palette_rgb(&self, palette_index: usize) -> u32 {
        let mask = if self.control2.test(CTL2_MONO) { 0x30 } else { 0x3F };
        PALETTE_RGB[(self.palette[palette_index] & mask) as usize]
    }

    fn render_scanline(&mut self, y: u32) {
        // backdrop fill; bg_low keeps each pixel's 2-bit background color
        // for sprite priority and sprite-0 hit
        let backdrop = self.palette_rgb(0);
        let row = &mut self.framebuffer[y as usize * WIDTH..(y as usize + 1) * WIDTH];
        row.fill(backdrop);

        let mut bg_low = [0u8; WIDTH];
        if self.control2.test(CTL2_BG_VISIBLE) {
            self.render_background(y, &mut bg_low);
        }
        if self.control2.test(CTL2_SPR_VISIBLE) {
            self.render_sprites(y, &bg_low);
        }
    }

    /// One row of background tiles: 33 columns to cover partial tiles at
    /// both edges when fine X is nonzero.
    fn render_background(&mut self, y: u32, bg_low: &mut [u8; WIDTH]) {
        // start of line: reload the horizontal scroll half from `t`
        self.v.put(VADDR_NT_H, self.t.test(VADDR_NT_H));
        self.v.update(VADDR_COARSE_X, self.t.select(VADDR_COARSE_X));

        let fine_y = self.v.select(VADDR_FINE_Y);
        let fine_x = self.fine_x.value();
        let pattern_base = if self.control1.test(CTL1_BG_PATTERN) { 0x1000usize } else { 0 };
        let clip_left = !self.control2.test(CTL2_BG_LEFT);

        // walk tile columns on a scratch copy of `v`
        let mut cur = self.v;
        for col in 0..=32u32 {
            let coarse_x = cur.select(VADDR_COARSE_X);
            let tile_row = cur.select(VADDR_COARSE_Y) % 30;

            let nt_addr = 0x2000 | cur.query(VADDR_NT) | (tile_row << 5) | coarse_x;
            let tile_id = self.nametables[(self.mirror(nt_addr as u16) - 0x2000) as usize] as usize;

            // attribute byte covers a 4x4-tile quadrant group; pick the
            // 2-bit sub-field for this tile's quadrant
            let attr_addr = 0x23C0 | cur.query(VADDR_NT) | ((tile_row >> 2) << 3) | (coarse_x >> 2);
            let mut lookup = self.nametables[(self.mirror(attr_addr as u16) - 0x2000) as usize];
            match ((tile_row & 3) >> 1 << 1) | ((coarse_x & 3) >> 1) {
                0 => lookup <<= 2,
                1 => {}
                2 => lookup >>= 2,
                3 => lookup >>= 4,
                _ => unreachable!(),
            }
            let color_high = lookup & 0x0C; // D3-D2

            let tile_addr = pattern_base + tile_id * 16 + fine_y as usize;
            let plane_low = self.pattern[tile_addr];
            let plane_high = self.pattern[tile_addr + 8];

            for px in 0..8u32 {
                let screen_x = (col * 8 + px) as i32 - fine_x as i32;
                if !(0..WIDTH as i32).contains(&screen_x) {
                    continue;
                }
                if clip_left && screen_x < 8 {
                    continue;
                }
                let bit = 7 - px;
                let color_low = ((plane_low >> bit) & 1) | (((plane_high >> bit) << 1) & 2);
                if color_low == 0 {
                    continue; // transparent, backdrop shows through
                }
                bg_low[screen_x as usize] = color_low;
                let rgb = self.palette_rgb((color_high | color_low) as usize);
                self.framebuffer[y as usize * WIDTH + screen_x as usize] = rgb;
            }

            // step one tile right, wrapping into the neighbour nametable
            if cur.inc_field(VADDR_COARSE_X) == 0 {
                cur.flip(VADDR_NT_H);
            }
        }

        // advance the vertical scroll for the next line: fine Y wraps into
        // coarse Y, which wraps at row 30 into the other nametable
        if self.v.inc_field(VADDR_FINE_Y) == 0 {
            if self.v.inc_field(VADDR_COARSE_Y) == 30 {
                self.v.update(VADDR_COARSE_Y, 0);
                self.v.flip(VADDR_NT_V);
            }
        }
    }

    /// Sprites for one scanline: evaluate the in-range subset, then paint
    /// behind-background sprites into transparent pixels and front sprites
    /// over everything. Lower OAM index wins within a pass.
    fn render_sprites(&mut self, y: u32, bg_low: &[u8; WIDTH]) {
        let height = if self.control1.test(CTL1_SPRITE_8X16) { 16u32 } else { 8 };

        // up to 8 in-range sprites, lowest OAM index first
        let mut selected = [0usize; 8];
        let mut count = 0;
        for index in 0..64 {
            let top = self.oam[index * 4] as u32; // stored Y is screen Y - 1
            if (top..top + height).contains(&y) {
                if count < 8 {
                    selected[count] = index;
                    count += 1;
                } else {
                    self.status.set(STATUS_OVERFLOW);
                    break;
                }
            }
        }

        // behind pass first, front pass second; higher index first within
        // a pass so lower-index sprites overwrite
        for behind_pass in [true, false] {
            for &index in selected[..count].iter().rev() {
                let attr = self.oam[index * 4 + 2];
                if (attr & ATTR_BEHIND != 0) != behind_pass {
                    continue;
                }
                self.draw_sprite(index, y, height, behind_pass, bg_low);
            }
        }
    }

    fn draw_sprite(&mut self, index: usize, y: u32, height: u32, behind: bool, bg_low: &[u8; WIDTH]) {
        let top = self.oam[index * 4] as u32;
        let tile = self.oam[index * 4 + 1];
        let attr = self.oam[index * 4 + 2];
        let sprite_x = self.oam[index * 4 + 3] as u32;

        let mut row = y - top;
        if attr & ATTR_FLIP_V != 0 {
            row = height - 1 - row;
        }

        // 8x16 sprites take their pattern table from the tile's low bit
        // and stack two tiles vertically
        let (tile_addr, row_in_tile) = if height == 8 {
            let base = if self.control1.test(CTL1_SPR_PATTERN) { 0x1000usize } else { 0 };
            (base + tile as usize * 16, row as usize)
        } else {
            let base = (tile as usize & 1) * 0x1000;
            let tile16 = tile as usize & 0xFE;
            if row < 8 {
                (base + tile16 * 16, row as usize)
            } else {
                (base + (tile16 + 1) * 16, row as usize - 8)
            }
        };

        let plane_low = self.pattern[tile_addr + row_in_tile];
        let plane_high = self.pattern[tile_addr + row_in_tile + 8];
        let palette_base = 0x10 | ((attr & ATTR_PALETTE) as usize) << 2;
        let clip_left = !self.control2.test(CTL2_SPR_LEFT);
        let bg_enabled = self.control2.test(CTL2_BG_VISIBLE);
        let bg_clip_left = !self.control2.test(CTL2_BG_LEFT);

        for px in 0..8u32 {
            let screen_x = sprite_x + px;
            if screen_x >= WIDTH as u32 {
                continue;
            }
            let col = if attr & ATTR_FLIP_H != 0 { 7 - px } else { px };
            let bit = 7 - col;
            let color_low = ((plane_low >> bit) & 1) | (((plane_high >> bit) << 1) & 2);
            if color_low == 0 {
                continue;
            }
            if clip_left && screen_x < 8 {
                continue;
            }

            let bg_opaque = bg_low[screen_x as usize] != 0;

            // sprite 0 hit: first opaque-on-opaque coincidence per frame,
            // with the left-clip and rightmost-column exclusions
            if index == 0
                && !self.hit_this_frame
                && bg_opaque
                && bg_enabled
                && !(bg_clip_left && screen_x < 8)
                && screen_x != 255
            {
                self.status.set(STATUS_SPRITE0_HIT);
                self.hit_this_frame = true;
            }

            if behind && bg_opaque {
                continue;
            }
            let rgb = self.palette_rgb(palette_base | color_low as usize);
            self.framebuffer[y as usize * WIDTH + screen_x as usize] = rgb;
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
