use crate::bits::field::{BitField, Wide};
use crate::bits::flags::FlagReg;

type Addr14 = BitField<14>;

#[test]
fn inc_dec_wrap_at_boundaries() {
    let mut addr = Addr14::new(0x3FFF);
    assert!(addr.is_max());

    assert_eq!(addr.inc(), 0);
    assert!(addr.is_zero());

    assert_eq!(addr.dec(), 0x3FFF);
    assert!(addr.is_max() && !addr.is_zero());

    // inc(dec(v)) == v across the whole 8-bit range
    for v in 0..=0xFF {
        let mut f = BitField::<8>::new(v);
        f.dec();
        f.inc();
        assert_eq!(f.value(), v);
        f.inc();
        f.dec();
        assert_eq!(f.value(), v);
    }
}

#[test]
fn msb_lsb_and_sign() {
    let addr = Addr14::new(0x3FFF);
    assert!(addr.msb() && addr.lsb() && addr.is_negative());

    let mut addr = Addr14::new(0x3FFF);
    addr.shr(2);
    assert_eq!(addr.value(), 0xFFF);
    assert!(!addr.msb() && !addr.is_negative());
}

#[test]
fn shifts_mask_to_width() {
    let mut addr = Addr14::new(0xFFF);
    addr.shl(1);
    assert!(!addr.lsb());
    assert_eq!(addr.value(), 0x1FFE);
    addr.shl(14);
    assert!(addr.is_zero());
}

#[test]
fn plain_rotate_wraps_within_field() {
    let mut addr = Addr14::new(0x1010);
    addr.rol();
    assert!(addr.msb() && !addr.lsb());
    addr.rol();
    assert!(!addr.msb() && addr.lsb());
    assert_eq!(addr.value(), 0x0041);

    addr.ror();
    assert_eq!(addr.value(), 0x2020);
    addr.ror();
    assert_eq!(addr.value(), 0x1010);
}

#[test]
fn rotate_with_carry_round_trips() {
    let mut addr = Addr14::new(0x2000);
    assert!(addr.msb());
    let carry = addr.rcl(true);
    assert!(carry);
    assert_eq!(addr.value(), 1);

    let carry = addr.rcr(true);
    assert!(addr.msb());
    assert!(carry);

    // rcr then rcl with the bits that came out restores value and carry
    for v in [0u32, 1, 0x80, 0xAA, 0x55, 0xFF] {
        for carry_in in [false, true] {
            let mut f = BitField::<8>::new(v);
            let out = f.rcr(carry_in);
            let back = f.rcl(out);
            assert_eq!(f.value(), v);
            assert_eq!(back, carry_in);
        }
    }
}

#[test]
fn low_bit_helpers() {
    let mut addr = Addr14::new(0x1010);
    addr.not();
    assert_eq!(addr.value(), 0x2FEF);
    addr.drop_low_bit();
    assert_eq!(addr.value(), 0x2FEE);
    addr.shl(8);
    assert_eq!(addr.value(), 0x2E00);
    assert_eq!(addr.low_bit(), 0x200);
    addr.drop_low_bit();
    assert_eq!(addr.value(), 0x2C00);

    addr.rtrim();
    assert_eq!(addr.value(), 0b1011);
    addr.xor(0b0011);
    addr.rtrim();
    assert_eq!(addr.value(), 0b1);
}

#[test]
fn sub_wraps() {
    let mut addr = Addr14::new(1);
    addr.sub(0xFFFF_FFFF);
    assert_eq!(addr.value(), 2);
}

#[test]
fn wide_overflow_reports_premask_excess() {
    let mut sum = Wide::<8>::new(0x50);
    sum.add(0x50);
    assert!(!sum.is_overflow());
    sum.add(0xFF);
    assert!(sum.is_overflow());

    // masking discards the overflow information
    let trimmed = sum.trim();
    assert!(!Wide::from_field(trimmed).is_overflow());

    let sum = Wide::<8>::new(0x1FF);
    assert!(sum.is_overflow());
    let mut half = Wide::<8>::new(sum.value() >> 1);
    assert!(!half.is_overflow());
    half.add(0);
    assert!(!half.is_overflow());
}

// masks mirroring the shapes exercised by the status register
const F_ZERO: u32 = 0x02;
const F_BCD: u32 = 0x08;
const F_NEGATIVE: u32 = 0x80;
const F_FIELD: u32 = 0x70; // contiguous 3-bit field
const F_LOW: u32 = 0x03; // contiguous 2-bit field

#[test]
fn single_bit_ops() {
    let mut p = FlagReg::<8>::default();
    assert!(!p.any());

    p.set(F_ZERO);
    p.clear(F_BCD);
    assert_eq!(p.value(), F_ZERO);
    p.flip(F_NEGATIVE);
    assert_eq!(p.value(), F_ZERO | F_NEGATIVE);
    p.flip(F_ZERO);
    assert_eq!(p.value(), F_NEGATIVE);

    p.put(F_BCD, true);
    assert!(p.test(F_BCD));
    p.put(F_BCD, false);
    assert!(!p.test(F_BCD));
}

#[test]
fn field_update_preserves_unrelated_bits() {
    let mut p = FlagReg::<8>::default();
    p.set_all();
    p.update(F_FIELD, 0b000);
    assert_eq!(p.value(), 0xFF - F_FIELD);
    assert_eq!(p.select(F_LOW), 0b11);
    assert!(p.test(F_NEGATIVE));

    p.update(F_LOW, 0b10);
    assert_eq!(p.select(F_LOW), 0b10);
    assert_eq!(p.select(F_FIELD), 0b000);
    assert!(p.test(F_NEGATIVE));
}

#[test]
fn field_select_shifts_past_low_bit() {
    let mut p = FlagReg::<8>::default();
    p.load(0xFF);
    assert_eq!(p.query(F_FIELD), 0x70);
    assert_eq!(p.select(F_FIELD), 0b111);
}

#[test]
fn inc_field_wraps_within_field() {
    let mut p = FlagReg::<8>::default();
    p.set(F_FIELD);
    assert_eq!(p.inc_field(F_FIELD), 0);
    assert!(!p.any());
    assert_eq!(p.inc_field(F_FIELD), 1);
    assert_eq!(p.select(F_FIELD), 1);
    assert_eq!(p.inc_field(F_FIELD), 2);
}

#[test]
fn load_is_bulk_copy() {
    let mut p = FlagReg::<8>::default();
    p.load(0xFF);
    // query accepts scattered masks; only the shifted field ops need contiguity
    assert_eq!(p.query(0x11), 0x11);
    assert_eq!(p.query(0x44), 0x44);
    p.update(0x60, 0);
    assert_eq!(p.value(), 0xFF - 0x60);
}
