use classgen::code_attribute::{decode_instructions, encode_instructions, instruction_addresses, instruction_byte_size, Instruction};
use pretty_assertions::assert_eq;

#[test]
fn simple_operands_are_big_endian() {
    assert_eq!(encode_instructions(&[Instruction::Sipush(-2)]).unwrap(), vec![0x11, 0xff, 0xfe]);
    assert_eq!(encode_instructions(&[Instruction::Goto(-3)]).unwrap(), vec![0xa7, 0xff, 0xfd]);
}

#[test]
fn wide_forms_carry_two_byte_magic() {
    assert_eq!(
        encode_instructions(&[Instruction::IloadWide(0xaabb)]).unwrap(),
        vec![0xc4, 0x15, 0xaa, 0xbb]
    );
    assert_eq!(
        encode_instructions(&[Instruction::IincWide { index: 300, value: -1 }]).unwrap(),
        vec![0xc4, 0x84, 0x01, 0x2c, 0xff, 0xff]
    );
}

fn table() -> Instruction {
    Instruction::Tableswitch {
        default: 10,
        low: 20,
        high: 21,
        offsets: vec![30, 31],
    }
}

#[test]
fn tableswitch_pads_to_four_bytes() {
    let at_zero = encode_instructions(&[table()]).unwrap();
    assert_eq!(
        at_zero,
        vec![0xaa, 0, 0, 0, 0, 0, 0, 10, 0, 0, 0, 20, 0, 0, 0, 21, 0, 0, 0, 30, 0, 0, 0, 31]
    );
    assert_eq!(instruction_byte_size(&table(), 0), 24);

    let shifted = encode_instructions(&[Instruction::Nop, Instruction::Nop, Instruction::Nop, table()]).unwrap();
    assert_eq!(
        &shifted[3..],
        &[0xaa, 0, 0, 0, 10, 0, 0, 0, 20, 0, 0, 0, 21, 0, 0, 0, 30, 0, 0, 0, 31][..]
    );
    assert_eq!(instruction_byte_size(&table(), 3), 21);
}

#[test]
fn lookupswitch_size_follows_pair_count() {
    let lookup = Instruction::Lookupswitch {
        default: 40,
        npairs: 2,
        pairs: vec![(-5, 12), (1000, 20)],
    };
    assert_eq!(instruction_byte_size(&lookup, 1), 1 + 2 + 8 + 16);
    let bytes = encode_instructions(&[Instruction::Nop, lookup.clone()]).unwrap();
    assert_eq!(bytes.len(), 1 + 1 + 2 + 8 + 16);
    let decoded = decode_instructions(&bytes).unwrap();
    assert_eq!(decoded, vec![(0, Instruction::Nop), (1, lookup)]);
}

#[test]
fn addresses_account_for_padding() {
    let code = vec![Instruction::Iconst0, Instruction::Bipush(7), table(), Instruction::Ireturn];
    let (addresses, end) = instruction_addresses(&code);
    assert_eq!(addresses, vec![0, 1, 3, 24]);
    assert_eq!(end, 25);
    assert_eq!(encode_instructions(&code).unwrap().len(), 25);
}
