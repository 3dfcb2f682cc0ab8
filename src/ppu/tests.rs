use crate::cartridge::Mirroring;
use crate::ppu::ppu::{
    Ppu, CTL1_INCREMENT_32, CTL1_NMI, CTL2_BG_LEFT, CTL2_BG_VISIBLE, CTL2_SPR_LEFT,
    CTL2_SPR_VISIBLE, PALETTE_RGB, SCANLINE_VBLANK, STATUS_SPRITE0_HIT, STATUS_VBLANK, WIDTH,
};
use crate::ppu::Screen;

/// Screen double that counts presentations.
struct CountingScreen {
    blits: usize,
}

impl Screen for CountingScreen {
    fn blit(&mut self, buffer: &[u32], width: usize, height: usize) {
        assert_eq!(buffer.len(), width * height);
        self.blits += 1;
    }
}

fn ppu_with(mirroring: Mirroring) -> Ppu {
    let mut ppu = Ppu::new();
    ppu.set_mirroring(mirroring);
    ppu
}

/// Write a VRAM byte through the $2006/$2007 port protocol.
fn port_write_vram(ppu: &mut Ppu, addr: u16, data: u8) {
    ppu.read_port(0x2002); // reset the write toggle
    ppu.write_port(0x2006, (addr >> 8) as u8);
    ppu.write_port(0x2006, addr as u8);
    ppu.write_port(0x2007, data);
}

/// Read a VRAM byte through the ports, skipping the stale buffered value.
fn port_read_vram(ppu: &mut Ppu, addr: u16) -> u8 {
    ppu.read_port(0x2002);
    ppu.write_port(0x2006, (addr >> 8) as u8);
    ppu.write_port(0x2006, addr as u8);
    if addr < 0x3F00 {
        ppu.read_port(0x2007); // prime the read buffer
        ppu.write_port(0x2006, (addr >> 8) as u8);
        ppu.write_port(0x2006, addr as u8);
    }
    ppu.read_port(0x2007)
}

// ---- mirroring ----

#[test]
fn mirroring_is_a_projection() {
    for mode in [
        Mirroring::Horizontal,
        Mirroring::Vertical,
        Mirroring::SingleScreen,
        Mirroring::FourScreen,
    ] {
        let ppu = ppu_with(mode);
        for addr in (0x0000..0x4000).step_by(7) {
            let once = ppu.mirror(addr);
            assert_eq!(ppu.mirror(once), once, "{mode:?} ${addr:04X}");
        }
    }
}

#[test]
fn pattern_range_passes_through() {
    let ppu = ppu_with(Mirroring::Horizontal);
    assert_eq!(ppu.mirror(0x1395), 0x1395);
}

#[test]
fn horizontal_mirroring_collapses_h_bit() {
    let ppu = ppu_with(Mirroring::Horizontal);
    assert_eq!(ppu.mirror(0x2011), 0x2011);
    assert_eq!(ppu.mirror(0x22FF), 0x22FF);
    assert_eq!(ppu.mirror(0x2409), 0x2009);
    assert_eq!(ppu.mirror(0x2871), 0x2871);
    assert_eq!(ppu.mirror(0x2AF1), 0x2AF1);
    // $3000 bank aliases down into the nametables first
    assert_eq!(ppu.mirror(0x2D22), 0x2922);
}

#[test]
fn vertical_mirroring_collapses_v_bit() {
    let ppu = ppu_with(Mirroring::Vertical);
    assert_eq!(ppu.mirror(0x2011), 0x2011);
    assert_eq!(ppu.mirror(0x2405), 0x2405);
    assert_eq!(ppu.mirror(0x2677), 0x2677);
    assert_eq!(ppu.mirror(0x28A3), 0x20A3);
    assert_eq!(ppu.mirror(0x2FFF), 0x27FF);
}

#[test]
fn single_screen_forces_first_table() {
    let ppu = ppu_with(Mirroring::SingleScreen);
    assert_eq!(ppu.mirror(0x2D70), 0x2170);
}

#[test]
fn four_screen_leaves_tables_alone() {
    let ppu = ppu_with(Mirroring::FourScreen);
    assert_eq!(ppu.mirror(0x2FED), 0x2FED);
    assert_eq!(ppu.mirror(0x3AED), 0x2AED);
}

#[test]
fn palette_mirroring() {
    let ppu = ppu_with(Mirroring::Horizontal);
    assert_eq!(ppu.mirror(0x3F9F), 0x3F1F);
    // sprite "transparent" slots alias the background slots
    assert_eq!(ppu.mirror(0x3F10), 0x3F00);
    assert_eq!(ppu.mirror(0x3F14), 0x3F04);
    assert_eq!(ppu.mirror(0x3F18), 0x3F08);
    assert_eq!(ppu.mirror(0x3F1C), 0x3F0C);
    // non-multiple-of-4 entries stay distinct
    assert_eq!(ppu.mirror(0x3F05), 0x3F05);
    assert_eq!(ppu.mirror(0x3F19), 0x3F19);
}

#[test]
fn palette_storage_aliases_through_ports() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    port_write_vram(&mut ppu, 0x3F10, 0x21);
    assert_eq!(port_read_vram(&mut ppu, 0x3F00), 0x21);

    port_write_vram(&mut ppu, 0x3F05, 0x15);
    port_write_vram(&mut ppu, 0x3F00, 0x30);
    assert_eq!(port_read_vram(&mut ppu, 0x3F05), 0x15);
}

// ---- ports ----

#[test]
fn status_read_clears_vblank_and_toggle() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    let mut screen = CountingScreen { blits: 0 };
    // advance into vblank
    for _ in 0..=SCANLINE_VBLANK {
        ppu.end_scanline(&mut screen);
    }
    assert!(ppu.status.test(STATUS_VBLANK));
    let value = ppu.read_port(0x2002);
    assert_eq!(value as u32 & STATUS_VBLANK, STATUS_VBLANK);
    assert!(!ppu.status.test(STATUS_VBLANK));
}

#[test]
fn address_port_assembles_fifteen_bit_address() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    port_write_vram(&mut ppu, 0x2108, 0x55);
    assert_eq!(port_read_vram(&mut ppu, 0x2108), 0x55);
}

#[test]
fn data_port_increments_by_one_or_thirty_two() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    ppu.write_port(0x2006, 0x20);
    ppu.write_port(0x2006, 0x00);
    ppu.write_port(0x2007, 0x11);
    ppu.write_port(0x2007, 0x22); // lands at $2001
    assert_eq!(port_read_vram(&mut ppu, 0x2000), 0x11);
    assert_eq!(port_read_vram(&mut ppu, 0x2001), 0x22);

    ppu.write_port(0x2000, CTL1_INCREMENT_32 as u8);
    ppu.read_port(0x2002);
    ppu.write_port(0x2006, 0x20);
    ppu.write_port(0x2006, 0x40);
    ppu.write_port(0x2007, 0x33);
    ppu.write_port(0x2007, 0x44); // lands at $2060
    ppu.write_port(0x2000, 0); // back to +1 for the readback
    assert_eq!(port_read_vram(&mut ppu, 0x2040), 0x33);
    assert_eq!(port_read_vram(&mut ppu, 0x2060), 0x44);
}

#[test]
fn data_port_reads_are_buffered() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    port_write_vram(&mut ppu, 0x2000, 0xAB);
    port_write_vram(&mut ppu, 0x2001, 0xCD);

    ppu.read_port(0x2002);
    ppu.write_port(0x2006, 0x20);
    ppu.write_port(0x2006, 0x00);
    let stale = ppu.read_port(0x2007); // whatever the latch held before
    let first = ppu.read_port(0x2007);
    let second = ppu.read_port(0x2007);
    let _ = stale;
    assert_eq!(first, 0xAB);
    assert_eq!(second, 0xCD);
}

#[test]
fn palette_reads_bypass_the_buffer() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    port_write_vram(&mut ppu, 0x3F01, 0x2A);
    ppu.read_port(0x2002);
    ppu.write_port(0x2006, 0x3F);
    ppu.write_port(0x2006, 0x01);
    assert_eq!(ppu.read_port(0x2007), 0x2A);
}

#[test]
fn ports_mirror_every_eight_bytes() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    port_write_vram(&mut ppu, 0x2000, 0x5A);
    ppu.read_port(0x2002);
    ppu.write_port(0x3FF6, 0x20); // $2006 through the top mirror
    ppu.write_port(0x3FF6, 0x00);
    ppu.read_port(0x3FF7);
    assert_eq!(ppu.read_port(0x3FF7), 0x5A);
}

#[test]
fn oam_writes_increment_reads_do_not() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    ppu.write_port(0x2003, 0x10);
    ppu.write_port(0x2004, 0xAA);
    ppu.write_port(0x2004, 0xBB);
    ppu.write_port(0x2003, 0x10);
    assert_eq!(ppu.read_port(0x2004), 0xAA);
    assert_eq!(ppu.read_port(0x2004), 0xAA); // read leaves OAMADDR alone
    ppu.write_port(0x2003, 0x11);
    assert_eq!(ppu.read_port(0x2004), 0xBB);
}

#[test]
fn oam_dma_fills_sprite_memory() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    let mut page = [0u8; 256];
    for (i, b) in page.iter_mut().enumerate() {
        *b = i as u8;
    }
    ppu.oam_dma(&page);
    ppu.write_port(0x2003, 0x42);
    assert_eq!(ppu.read_port(0x2004), 0x42);
}

// ---- frame state machine ----

#[test]
fn full_frame_presents_once_and_counts() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    let mut screen = CountingScreen { blits: 0 };

    let mut completions = 0;
    for line in 0..262 {
        let done = ppu.end_scanline(&mut screen);
        assert_eq!(done, line == 261, "scanline {line}");
        if done {
            completions += 1;
        }
        // vblank flag holds from 241 through 260
        let in_vblank = (241..=260).contains(&line);
        assert_eq!(ppu.status.test(STATUS_VBLANK), in_vblank, "scanline {line}");
    }
    assert_eq!(completions, 1);
    assert_eq!(ppu.frame, 1);
    assert_eq!(screen.blits, 1);
    assert_eq!(ppu.scanline(), 0);
}

#[test]
fn nmi_raised_at_vblank_when_enabled() {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(0x2000, CTL1_NMI as u8);
    for _ in 0..=SCANLINE_VBLANK {
        ppu.end_scanline(&mut screen);
    }
    assert!(ppu.take_nmi());
    assert!(!ppu.take_nmi()); // consumed

    // disabled: no request
    let mut ppu = ppu_with(Mirroring::Horizontal);
    for _ in 0..=SCANLINE_VBLANK {
        ppu.end_scanline(&mut screen);
    }
    assert!(!ppu.take_nmi());
}

// ---- rendering ----

/// Solid 8x8 tile (color 3) in pattern slot 1, tile 1 in the top-left of
/// nametable 0, palette 0 configured, backdrop distinct.
fn rendering_ppu() -> Ppu {
    let mut ppu = ppu_with(Mirroring::Horizontal);
    let mut bank = [0u8; 0x400];
    bank[16..32].fill(0xFF); // tile 1: both planes solid
    ppu.load_pattern_bank(0, &bank);

    for col in 0..4 {
        port_write_vram(&mut ppu, 0x2000 + col, 0x01); // tile 1
    }
    port_write_vram(&mut ppu, 0x3F00, 0x0F); // backdrop: black
    port_write_vram(&mut ppu, 0x3F03, 0x21); // background color 3
    port_write_vram(&mut ppu, 0x3F13, 0x15); // sprite color 3
    ppu
}

#[test]
fn background_scanline_renders_palette_colors() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(0x2001, (CTL2_BG_VISIBLE | CTL2_BG_LEFT) as u8);

    ppu.end_scanline(&mut screen); // scanline 0
    assert_eq!(ppu.framebuffer[0], PALETTE_RGB[0x21]);
    assert_eq!(ppu.framebuffer[31], PALETTE_RGB[0x21]);
    // past the four solid tiles: backdrop
    assert_eq!(ppu.framebuffer[40], PALETTE_RGB[0x0F]);
}

#[test]
fn background_left_clip() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(0x2001, CTL2_BG_VISIBLE as u8); // left column clipped

    ppu.end_scanline(&mut screen);
    assert_eq!(ppu.framebuffer[7], PALETTE_RGB[0x0F]);
    assert_eq!(ppu.framebuffer[8], PALETTE_RGB[0x21]);
}

#[test]
fn sprite_renders_and_hits_sprite_zero() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(
        0x2001,
        (CTL2_BG_VISIBLE | CTL2_SPR_VISIBLE | CTL2_BG_LEFT | CTL2_SPR_LEFT) as u8,
    );
    // sprite 0: stored Y = screen Y - 1, over the solid background
    ppu.write_port(0x2003, 0x00);
    ppu.write_port(0x2004, 0x04); // covers scanlines 4..12
    ppu.write_port(0x2004, 0x01); // tile 1
    ppu.write_port(0x2004, 0x00); // front priority, palette 0
    ppu.write_port(0x2004, 0x08); // X = 8

    for _ in 0..6 {
        ppu.end_scanline(&mut screen);
    }
    assert!(ppu.status.test(STATUS_SPRITE0_HIT));
    // sprite pixel over background pixel
    assert_eq!(ppu.framebuffer[5 * WIDTH + 8], PALETTE_RGB[0x15]);
}

#[test]
fn behind_background_sprite_only_fills_transparent_pixels() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(
        0x2001,
        (CTL2_BG_VISIBLE | CTL2_SPR_VISIBLE | CTL2_BG_LEFT | CTL2_SPR_LEFT) as u8,
    );
    // sprite 1 (not sprite 0) straddling the edge of the solid tiles:
    // X=28 puts pixels 28..36, background opaque through 31
    ppu.write_port(0x2003, 0x04);
    ppu.write_port(0x2004, 0x04);
    ppu.write_port(0x2004, 0x01);
    ppu.write_port(0x2004, 0x20); // behind background
    ppu.write_port(0x2004, 0x1C);

    for _ in 0..6 {
        ppu.end_scanline(&mut screen);
    }
    let row = 5 * WIDTH;
    // over opaque background: background wins
    assert_eq!(ppu.framebuffer[row + 30], PALETTE_RGB[0x21]);
    // over transparent background: sprite shows
    assert_eq!(ppu.framebuffer[row + 34], PALETTE_RGB[0x15]);
    // behind-background sprite never sets the hit flag for sprite 1
    assert!(!ppu.status.test(STATUS_SPRITE0_HIT));
}

#[test]
fn sprite_overflow_sets_status_bit() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(0x2001, (CTL2_SPR_VISIBLE | CTL2_SPR_LEFT) as u8);
    // nine sprites share scanline 5
    ppu.write_port(0x2003, 0x00);
    for i in 0..9u8 {
        ppu.write_port(0x2004, 0x04);
        ppu.write_port(0x2004, 0x01);
        ppu.write_port(0x2004, 0x00);
        ppu.write_port(0x2004, 8 * i);
    }
    for _ in 0..6 {
        ppu.end_scanline(&mut screen);
    }
    assert!(ppu.status.test(crate::ppu::ppu::STATUS_OVERFLOW));
}

#[test]
fn coarse_x_scroll_shifts_background() {
    let mut ppu = rendering_ppu();
    let mut screen = CountingScreen { blits: 0 };
    ppu.write_port(0x2001, (CTL2_BG_VISIBLE | CTL2_BG_LEFT) as u8);
    // scroll one tile right: screen column 0 now shows nametable tile 1
    ppu.read_port(0x2002);
    ppu.write_port(0x2005, 0x08);
    ppu.write_port(0x2005, 0x00);

    ppu.end_scanline(&mut screen);
    // tiles 1..3 remain solid: 24 colored pixels, then backdrop
    assert_eq!(ppu.framebuffer[0], PALETTE_RGB[0x21]);
    assert_eq!(ppu.framebuffer[23], PALETTE_RGB[0x21]);
    assert_eq!(ppu.framebuffer[24], PALETTE_RGB[0x0F]);
}
