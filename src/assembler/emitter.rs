//! The object emitter serializes a finished `AssemblyUnit` into the
//! relocatable object format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic(u32) code_len(u32) data_len(u32) symtab_len(u32) reloc_len(u32)
//! code bytes | data bytes | symbol table | relocation table
//! ```
//!
//! The symbol table section is `count(u32)` then, per symbol,
//! `name_len(u32) name kind(u8) binding(u8) address(u32)`. The
//! relocation table is `count(u32)` then, per entry, `offset(u32)
//! target_len(u32) target`. A relocation is produced only for
//! references to GLOBAL symbols; its offset points at the zeroed
//! 4-byte address field inside the code section.
//!
//! The data section is the bare concatenation of 4-byte values; entry
//! names are not kept, so an object consumer cannot relocate *into*
//! the data section. Known format limitation, left as-is.

use byteorder::{LittleEndian, WriteBytesExt};

use super::ast::{AssemblyUnit, Relocation};
use super::error::AsmError;
use super::symtab::SymbolTable;

/// Object file tag, `b"SOBJ"` read as a little-endian u32. Distinct
/// from the raw non-relocatable bytecode tag `b"STAK"`.
pub const OBJ_MAGIC: u32 = 0x4A42_4F53;

/// Serialize the unit into one object byte stream. Any reference to a
/// symbol absent from the table aborts the whole emission; nothing is
/// returned on failure.
pub fn emit_object(unit: &AssemblyUnit) -> Result<Vec<u8>, AsmError> {
    let (code, relocations) = emit_code_section(unit)?;
    debug!(
        "code section: {} byte(s), {} relocation(s)",
        code.len(),
        relocations.len()
    );
    let data = emit_data_section(unit)?;
    let symtab = emit_symbol_section(&unit.symbols)?;
    let reloc = emit_relocation_section(&relocations)?;

    let mut out = Vec::with_capacity(20 + code.len() + data.len() + symtab.len() + reloc.len());
    out.write_u32::<LittleEndian>(OBJ_MAGIC)?;
    out.write_u32::<LittleEndian>(code.len() as u32)?;
    out.write_u32::<LittleEndian>(data.len() as u32)?;
    out.write_u32::<LittleEndian>(symtab.len() as u32)?;
    out.write_u32::<LittleEndian>(reloc.len() as u32)?;
    out.extend_from_slice(&code);
    out.extend_from_slice(&data);
    out.extend_from_slice(&symtab);
    out.extend_from_slice(&reloc);
    Ok(out)
}

/// Encode the instruction stream, collecting a relocation for every
/// GLOBAL reference as it goes.
fn emit_code_section(unit: &AssemblyUnit) -> Result<(Vec<u8>, Vec<Relocation>), AsmError> {
    let mut code = Vec::new();
    let mut relocations = Vec::new();

    for ins in &unit.instructions {
        let start = code.len() as u32;
        let (bytes, reloc_target) = ins.encode(&unit.symbols)?;
        if let Some(target) = reloc_target {
            // The address field begins right after the opcode byte.
            relocations.push(Relocation {
                offset: start + 1,
                target,
            });
        }
        code.extend_from_slice(&bytes);
    }

    Ok((code, relocations))
}

fn emit_data_section(unit: &AssemblyUnit) -> Result<Vec<u8>, AsmError> {
    let mut data = Vec::with_capacity(unit.data.len() * 4);
    for entry in &unit.data {
        data.write_i32::<LittleEndian>(entry.value)?;
    }
    Ok(data)
}

fn emit_symbol_section(symbols: &SymbolTable) -> Result<Vec<u8>, AsmError> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(symbols.len() as u32)?;
    for sym in symbols.iter() {
        buf.write_u32::<LittleEndian>(sym.name.len() as u32)?;
        buf.extend_from_slice(sym.name.as_bytes());
        buf.push(sym.kind.to_u8());
        buf.push(sym.binding.to_u8());
        buf.write_u32::<LittleEndian>(sym.address)?;
    }
    Ok(buf)
}

fn emit_relocation_section(relocations: &[Relocation]) -> Result<Vec<u8>, AsmError> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(relocations.len() as u32)?;
    for reloc in relocations {
        buf.write_u32::<LittleEndian>(reloc.offset)?;
        buf.write_u32::<LittleEndian>(reloc.target.len() as u32)?;
        buf.extend_from_slice(reloc.target.as_bytes());
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::parse_source;

    fn u32_at(bytes: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
    }

    #[test]
    fn test_plain_arithmetic_object() {
        // iconst 2 / iconst 3 / iadd / ret, nothing else.
        let unit = parse_source(".text\niconst 2\niconst 3\niadd\nret\n").unwrap();
        assert_eq!(unit.instructions.len(), 4);
        let obj = emit_object(&unit).unwrap();

        assert_eq!(u32_at(&obj, 0), OBJ_MAGIC);
        let code_len = u32_at(&obj, 4) as usize;
        assert_eq!(code_len, 12);
        assert_eq!(
            &obj[20..20 + code_len],
            &[0x01, 2, 0, 0, 0, 0x01, 3, 0, 0, 0, 0x02, 0x04]
        );
        // No data, and count-0 symbol/relocation sections.
        assert_eq!(u32_at(&obj, 8), 0);
        assert_eq!(u32_at(&obj, 12), 4);
        assert_eq!(u32_at(&obj, 16), 4);
        assert_eq!(u32_at(&obj, 20 + code_len), 0);
        assert_eq!(u32_at(&obj, 20 + code_len + 4), 0);
    }

    #[test]
    fn test_header_lengths_match_sections() {
        let obj = emit_object(
            &parse_source(
                ".data\n\
                 .static a 1\n\
                 .static b 2\n\
                 .text\n\
                 .global main\n\
                 main:\n\
                 iconst 1\n\
                 jmp main\n\
                 ret\n",
            )
            .unwrap(),
        )
        .unwrap();

        let code_len = u32_at(&obj, 4) as usize;
        let data_len = u32_at(&obj, 8) as usize;
        let symtab_len = u32_at(&obj, 12) as usize;
        let reloc_len = u32_at(&obj, 16) as usize;
        assert_eq!(obj.len(), 20 + code_len + data_len + symtab_len + reloc_len);
        assert_eq!(data_len, 8);
    }

    #[test]
    fn test_local_reference_resolved_in_place() {
        let obj = emit_object(
            &parse_source(
                ".text\n\
                 iconst 1\n\
                 target:\n\
                 ret\n\
                 jmp target\n",
            )
            .unwrap(),
        )
        .unwrap();

        let code_len = u32_at(&obj, 4) as usize;
        let code = &obj[20..20 + code_len];
        // iconst(5 bytes) + ret(1 byte), then jmp with address 1.
        assert_eq!(&code[6..11], &[0x08, 1, 0, 0, 0]);
        // Local references never produce relocations.
        let reloc_start = 20 + code_len + (u32_at(&obj, 8) as usize) + (u32_at(&obj, 12) as usize);
        assert_eq!(u32_at(&obj, reloc_start), 0);
    }

    #[test]
    fn test_global_reference_gets_relocation() {
        // Forward jmp to a .global label: zero placeholder plus one
        // relocation pointing at the address field.
        let obj = emit_object(
            &parse_source(
                ".global foo\n\
                 .text\n\
                 jmp foo\n\
                 iconst 1\n\
                 foo:\n\
                 ret\n",
            )
            .unwrap(),
        )
        .unwrap();

        let code_len = u32_at(&obj, 4) as usize;
        let data_len = u32_at(&obj, 8) as usize;
        let symtab_len = u32_at(&obj, 12) as usize;
        let code = &obj[20..20 + code_len];
        assert_eq!(&code[0..5], &[0x08, 0, 0, 0, 0]);

        let symtab = &obj[20 + code_len + data_len..20 + code_len + data_len + symtab_len];
        assert_eq!(u32_at(symtab, 0), 1);
        assert_eq!(u32_at(symtab, 4), 3);
        assert_eq!(&symtab[8..11], b"foo");
        assert_eq!(symtab[11], 0); // kind: Code
        assert_eq!(symtab[12], 1); // binding: Global
        assert_eq!(u32_at(symtab, 13), 2); // instruction index of foo:

        let reloc = &obj[20 + code_len + data_len + symtab_len..];
        assert_eq!(u32_at(reloc, 0), 1);
        assert_eq!(u32_at(reloc, 4), 1); // byte after the jmp opcode
        assert_eq!(u32_at(reloc, 8), 3);
        assert_eq!(&reloc[12..15], b"foo");
    }

    #[test]
    fn test_reloc_offsets_skip_preceding_instructions() {
        let obj = emit_object(
            &parse_source(
                ".global f\n\
                 .text\n\
                 iconst 1\n\
                 invoke f 2\n\
                 jmp f\n\
                 f:\n\
                 ret\n",
            )
            .unwrap(),
        )
        .unwrap();

        let code_len = u32_at(&obj, 4) as usize;
        let data_len = u32_at(&obj, 8) as usize;
        let symtab_len = u32_at(&obj, 12) as usize;
        let reloc = &obj[20 + code_len + data_len + symtab_len..];
        assert_eq!(u32_at(reloc, 0), 2);
        // invoke at code offset 5, jmp at 11.
        assert_eq!(u32_at(reloc, 4), 6);
        let second = 4 + 4 + 4 + 1; // offset + len + "f"
        assert_eq!(u32_at(reloc, second), 12);
    }

    #[test]
    fn test_data_section_values_in_order() {
        let obj = emit_object(
            &parse_source(".data\n.static pos 5\n.static neg -5\n").unwrap(),
        )
        .unwrap();

        let code_len = u32_at(&obj, 4) as usize;
        assert_eq!(code_len, 0);
        let data = &obj[20..28];
        assert_eq!(&data[0..4], &[5, 0, 0, 0]);
        assert_eq!(&data[4..8], &[0xFB, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_undefined_reference_aborts_emission() {
        let unit = parse_source(".text\njmp nowhere\n").unwrap();
        let err = emit_object(&unit).unwrap_err();
        match err {
            AsmError::UndefinedSymbol(name) => assert_eq!(name, "nowhere"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
