use std::io::Cursor;

use binrw::{BinRead, BinResult, BinWrite, Endian};

use super::Instruction;

/// Encoded size of an instruction placed at `address`.
///
/// Only the two switch instructions depend on the address, through the
/// padding that aligns their operands to a four-byte boundary.
pub fn instruction_byte_size(instr: &Instruction, address: u32) -> u32 {
    use Instruction::*;
    match instr {
        Bipush(_) | Ldc(_) | Newarray(_) => 2,
        Iload(_) | Lload(_) | Fload(_) | Dload(_) | Aload(_) => 2,
        Istore(_) | Lstore(_) | Fstore(_) | Dstore(_) | Astore(_) => 2,
        Sipush(_) | LdcW(_) | Ldc2W(_) | Iinc { .. } => 3,
        Ifeq(_) | Ifne(_) | Iflt(_) | Ifge(_) | Ifgt(_) | Ifle(_) => 3,
        IfIcmpeq(_) | IfIcmpne(_) | IfIcmplt(_) | IfIcmpge(_) | IfIcmpgt(_) | IfIcmple(_) => 3,
        IfAcmpeq(_) | IfAcmpne(_) | Ifnull(_) | Ifnonnull(_) | Goto(_) => 3,
        Getstatic(_) | Putstatic(_) | Getfield(_) | Putfield(_) => 3,
        Invokevirtual(_) | Invokespecial(_) | Invokestatic(_) => 3,
        New(_) | Anewarray(_) | Checkcast(_) | Instanceof(_) => 3,
        Multianewarray { .. } => 4,
        Invokeinterface { .. } => 5,
        IloadWide(_) | LloadWide(_) | FloadWide(_) | DloadWide(_) | AloadWide(_) => 4,
        IstoreWide(_) | LstoreWide(_) | FstoreWide(_) | DstoreWide(_) | AstoreWide(_) => 4,
        IincWide { .. } => 6,
        Tableswitch { low, high, .. } => {
            let entries = (i64::from(*high) - i64::from(*low) + 1).max(0) as u32;
            1 + switch_padding(address) + 12 + 4 * entries
        }
        Lookupswitch { pairs, .. } => 1 + switch_padding(address) + 8 + 8 * pairs.len() as u32,
        _ => 1,
    }
}

fn switch_padding(address: u32) -> u32 {
    (4 - (address + 1) % 4) % 4
}

/// Byte address of every instruction, plus the address one past the end.
pub fn instruction_addresses(instructions: &[Instruction]) -> (Vec<u32>, u32) {
    let mut addresses = Vec::with_capacity(instructions.len());
    let mut address = 0u32;
    for instr in instructions {
        addresses.push(address);
        address += instruction_byte_size(instr, address);
    }
    (addresses, address)
}

/// Serialize resolved instructions into a `code` array.
pub fn encode_instructions(instructions: &[Instruction]) -> BinResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    for instr in instructions {
        let address = out.position() as u32;
        instr.write_options(&mut out, Endian::Big, (address,))?;
    }
    Ok(out.into_inner())
}

/// Decode a `code` array back into `(address, instruction)` pairs.
pub fn decode_instructions(code: &[u8]) -> BinResult<Vec<(u32, Instruction)>> {
    let mut cursor = Cursor::new(code);
    let mut decoded = Vec::new();
    while (cursor.position() as usize) < code.len() {
        let address = cursor.position() as u32;
        let instr = Instruction::read_options(&mut cursor, Endian::Big, (address,))?;
        decoded.push((address, instr));
    }
    Ok(decoded)
}
