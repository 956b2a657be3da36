//! Program listing loader.
//!
//! Each non-blank line is `<address> <mnemonic> <operands...>`. Operands are
//! separated by whitespace and/or commas, and everything from `//` to the end
//! of the line is a comment. Bad lines become [`Diagnostic`]s and are skipped.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use sim_core::{
    encode_word, opcode_for_mnemonic, GeneralRegister, InstructionFormat, Opcode, OperandFields,
    ProgramImage, HALT_MNEMONIC, HALT_WORD, MEMORY_BYTES,
};

use crate::errors::{CliError, Diagnostic, LoadError};

const COMMENT_MARKER: &str = "//";

/// Alternate spellings accepted for table mnemonics.
const MNEMONIC_ALIASES: &[(&str, Opcode)] = &[("slr", Opcode::Srl), ("sla", Opcode::Sra)];

/// A parsed listing: the loadable image plus every rejected line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedProgram {
    /// Words to write into memory.
    pub image: ProgramImage,
    /// Lines that were skipped.
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads and parses a listing file.
///
/// # Errors
///
/// Returns [`CliError::Read`] when the file cannot be read. Malformed lines
/// are not errors; they are reported in [`LoadedProgram::diagnostics`].
pub fn load_program(path: &Path) -> Result<LoadedProgram, CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let program = parse_program(&source);
    debug!(
        "{}: {} words, {} diagnostics",
        path.display(),
        program.image.len(),
        program.diagnostics.len()
    );
    Ok(program)
}

/// Parses listing text.
#[must_use]
pub fn parse_program(source: &str) -> LoadedProgram {
    let mut program = LoadedProgram::default();

    for (index, text) in source.lines().enumerate() {
        match parse_line(text) {
            Ok(Some((address, word))) => program.image.push(address, word),
            Ok(None) => {}
            Err(error) => {
                let diagnostic = Diagnostic {
                    line: index + 1,
                    text: text.to_string(),
                    error,
                };
                warn!("program {diagnostic}");
                program.diagnostics.push(diagnostic);
            }
        }
    }

    program
}

/// Splits a line into tokens, dropping the comment.
pub(crate) fn tokens(line: &str) -> impl Iterator<Item = &str> {
    let code = line.split(COMMENT_MARKER).next().unwrap_or_default();
    code.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
}

/// Parses one listing line into `(address, word)`, or `None` when blank.
///
/// # Errors
///
/// Returns the first problem found on the line.
pub fn parse_line(line: &str) -> Result<Option<(u32, u32)>, LoadError> {
    let mut operands = tokens(line);
    let Some(address) = operands.next() else {
        return Ok(None);
    };
    let address = parse_address(address)?;
    let mnemonic = operands.next().ok_or(LoadError::MissingField("mnemonic"))?;

    let word = if is_halt(mnemonic) {
        HALT_WORD
    } else {
        let opcode = resolve_mnemonic(mnemonic)?;
        let format = opcode
            .class()
            .format()
            .ok_or_else(|| LoadError::UnknownMnemonic(mnemonic.to_string()))?;
        let fields = parse_operands(format, &mut operands)?;
        encode_word(format, opcode.as_u8(), fields)
    };

    if let Some(extra) = operands.next() {
        return Err(LoadError::TrailingOperand(extra.to_string()));
    }
    Ok(Some((address, word)))
}

fn is_halt(mnemonic: &str) -> bool {
    mnemonic.eq_ignore_ascii_case(HALT_MNEMONIC) || mnemonic.eq_ignore_ascii_case("halt")
}

fn resolve_mnemonic(mnemonic: &str) -> Result<Opcode, LoadError> {
    opcode_for_mnemonic(mnemonic)
        .or_else(|| {
            MNEMONIC_ALIASES
                .iter()
                .find_map(|(alias, opcode)| mnemonic.eq_ignore_ascii_case(alias).then_some(*opcode))
        })
        .ok_or_else(|| LoadError::UnknownMnemonic(mnemonic.to_string()))
}

fn parse_operands<'a>(
    format: InstructionFormat,
    operands: &mut impl Iterator<Item = &'a str>,
) -> Result<OperandFields, LoadError> {
    let mut register = |name: &'static str| {
        operands
            .next()
            .ok_or(LoadError::MissingField(name))
            .and_then(parse_register)
    };

    let fields = match format {
        InstructionFormat::R => OperandFields {
            rd: Some(register("rd")?),
            rs1: Some(register("rs1")?),
            rs2: Some(register("rs2")?),
            imm: None,
        },
        InstructionFormat::I => OperandFields {
            rd: Some(register("rd")?),
            rs1: Some(register("rs1")?),
            rs2: None,
            imm: None,
        },
        InstructionFormat::SB => OperandFields {
            rd: None,
            rs1: Some(register("rs1")?),
            rs2: Some(register("rs2")?),
            imm: None,
        },
        InstructionFormat::J => OperandFields {
            rd: Some(register("rd")?),
            rs1: None,
            rs2: None,
            imm: None,
        },
    };

    if format == InstructionFormat::R {
        return Ok(fields);
    }
    let imm = operands
        .next()
        .ok_or(LoadError::MissingField("immediate"))
        .and_then(parse_immediate)?;
    Ok(OperandFields {
        imm: Some(imm),
        ..fields
    })
}

/// Parses a decimal or `0x`-prefixed hexadecimal instruction address.
///
/// # Errors
///
/// Rejects malformed numbers and addresses where a whole word would not fit
/// in memory or that are not word aligned.
pub fn parse_address(token: &str) -> Result<u32, LoadError> {
    let bad = || LoadError::BadAddress(token.to_string());
    let address = match strip_hex_prefix(token) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|_| bad())?,
        None => token.parse::<u32>().map_err(|_| bad())?,
    };

    let fits = usize::try_from(address)
        .ok()
        .and_then(|start| start.checked_add(4))
        .is_some_and(|end| end <= MEMORY_BYTES);
    if !fits {
        return Err(LoadError::AddressOutOfRange(address));
    }
    if address % 4 != 0 {
        return Err(LoadError::MisalignedAddress(address));
    }
    Ok(address)
}

/// Parses `x<n>` (the `x` is optional) into a register index below 32.
///
/// # Errors
///
/// Rejects anything that is not a register index in `0..32`.
pub fn parse_register(token: &str) -> Result<GeneralRegister, LoadError> {
    let digits = token
        .strip_prefix(['x', 'X'])
        .unwrap_or(token);
    digits
        .parse::<usize>()
        .ok()
        .and_then(GeneralRegister::new)
        .ok_or_else(|| LoadError::BadRegister(token.to_string()))
}

/// Parses a hexadecimal immediate with an optional `0x` prefix and an
/// optional leading `-`.
///
/// The value is returned as raw bits; the encoder masks it to the field
/// width.
///
/// # Errors
///
/// Rejects non-hex text and values wider than 32 bits.
pub fn parse_immediate(token: &str) -> Result<u32, LoadError> {
    let (negative, magnitude) = token
        .strip_prefix('-')
        .map_or((false, token), |rest| (true, rest));
    let hex = strip_hex_prefix(magnitude).unwrap_or(magnitude);
    let value = u32::from_str_radix(hex, 16)
        .ok()
        .filter(|_| !hex.starts_with('+'))
        .ok_or_else(|| LoadError::BadImmediate(token.to_string()))?;

    Ok(if negative { value.wrapping_neg() } else { value })
}

fn strip_hex_prefix(token: &str) -> Option<&str> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use sim_core::{Decoder, HALT_WORD};

    use super::{parse_address, parse_immediate, parse_line, parse_program, parse_register};
    use crate::errors::LoadError;

    fn disasm(line: &str) -> String {
        let (_, word) = parse_line(line).expect("valid").expect("not blank");
        Decoder::decode(word).instruction().to_string()
    }

    #[rstest]
    #[case("0 addi x1 x0 5", "addi x1, x0, 0x5")]
    #[case("0 addi x1, x0, 0x5", "addi x1, x0, 0x5")]
    #[case("0x10 add x3,x1,x2", "add x3, x1, x2")]
    #[case("4 sw x1 x2 6", "sw x1, x2, 0x6")]
    #[case("4 beq x1 x2 1 // skip ahead", "beq x1, x2, 0x1")]
    #[case("8 jal x1 400", "jal x1, 0x400")]
    #[case("8 JALR x2 x2 0", "jalr x2, x2, 0x0")]
    #[case("12 slr x5 x6 x7", "srl x5, x6, x7")]
    #[case("12 sla x5 x6 x7", "sra x5, x6, x7")]
    #[case("12 srai x5 x6 1f", "srai x5, x6, 0x1f")]
    #[case("16 lb x4 x1 b", "lb x4, x1, 0xb")]
    fn lines_encode_to_the_expected_instruction(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(disasm(line), expected);
    }

    #[rstest]
    #[case("20 SON")]
    #[case("20 son")]
    #[case("20 halt")]
    fn halt_spellings_encode_the_sentinel(#[case] line: &str) {
        assert_eq!(parse_line(line), Ok(Some((20, HALT_WORD))));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("// just a comment")]
    #[case("  , ,  ")]
    fn blank_and_comment_lines_are_skipped(#[case] line: &str) {
        assert_eq!(parse_line(line), Ok(None));
    }

    #[rstest]
    #[case("0 mul x1 x2 x3", LoadError::UnknownMnemonic("mul".into()))]
    #[case("0", LoadError::MissingField("mnemonic"))]
    #[case("0 add x1 x2", LoadError::MissingField("rs2"))]
    #[case("0 addi x1 x2", LoadError::MissingField("immediate"))]
    #[case("0 add x1 x2 x32", LoadError::BadRegister("x32".into()))]
    #[case("0 add x1 x2 y3", LoadError::BadRegister("y3".into()))]
    #[case("0 addi x1 x2 zz", LoadError::BadImmediate("zz".into()))]
    #[case("0 add x1 x2 x3 x4", LoadError::TrailingOperand("x4".into()))]
    #[case("0 SON x1", LoadError::TrailingOperand("x1".into()))]
    #[case("abc add x1 x2 x3", LoadError::BadAddress("abc".into()))]
    #[case("6 add x1 x2 x3", LoadError::MisalignedAddress(6))]
    #[case("0x100000 add x1 x2 x3", LoadError::AddressOutOfRange(0x10_0000))]
    #[case("0xFFFFE add x1 x2 x3", LoadError::AddressOutOfRange(0xF_FFFE))]
    fn malformed_lines_are_rejected(#[case] line: &str, #[case] expected: LoadError) {
        assert_eq!(parse_line(line), Err(expected));
    }

    #[test]
    fn registers_accept_optional_prefix() {
        assert_eq!(parse_register("x31").map(|r| r.index()), Ok(31));
        assert_eq!(parse_register("X7").map(|r| r.index()), Ok(7));
        assert_eq!(parse_register("4").map(|r| r.index()), Ok(4));
        assert!(parse_register("x").is_err());
        assert!(parse_register("x-1").is_err());
    }

    #[test]
    fn immediates_are_hexadecimal() {
        assert_eq!(parse_immediate("10"), Ok(0x10));
        assert_eq!(parse_immediate("0xFF"), Ok(0xFF));
        assert_eq!(parse_immediate("-1"), Ok(u32::MAX));
        assert!(parse_immediate("+1").is_err());
        assert!(parse_immediate("1_0").is_err());
        assert!(parse_immediate("123456789").is_err());
    }

    #[test]
    fn addresses_accept_decimal_and_hex() {
        assert_eq!(parse_address("16"), Ok(16));
        assert_eq!(parse_address("0x10"), Ok(16));
        assert_eq!(parse_address("0xFFFFC"), Ok(0xF_FFFC));
    }

    #[test]
    fn program_keeps_good_lines_and_reports_bad_ones() {
        let source = "\
0 addi x1 x0 5
4 addi x2 x0 3
8 mul x3 x1 x2

8 add x3 x1 x2
12 SON
";
        let program = parse_program(source);

        assert_eq!(
            program.image.words(),
            &[
                (0, 0x0050_0082),
                (4, 0x0030_0102),
                (8, 0x0020_8180),
                (12, HALT_WORD)
            ]
        );
        assert_eq!(program.diagnostics.len(), 1);
        assert_eq!(program.diagnostics[0].line, 3);
        assert_eq!(
            program.diagnostics[0].error,
            LoadError::UnknownMnemonic("mul".into())
        );
    }
}
