#![no_main]

use libfuzzer_sys::fuzz_target;
use sim_core::{
    disassemble_range, read_u32_be, run, validate_fetch, CoreState, Decoder, InvalidOpcodePolicy,
    ProgramImage, SimConfig,
};

fuzz_target!(|data: &[u8]| {
    let words: Vec<u32> = data
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if words.is_empty() {
        return;
    }

    for &word in &words {
        let decoded = Decoder::decode(word);
        let _ = decoded.instruction().to_string();
    }

    let image: ProgramImage = (0u32..).step_by(4).zip(words.iter().copied()).collect();
    let mut state = CoreState::default();
    if state.load_image(&image).is_err() {
        return;
    }
    let _ = disassemble_range(0, words.len(), &state.memory);

    let config = SimConfig {
        invalid_opcode: InvalidOpcodePolicy::Stall,
        step_budget: Some(1024),
        ..SimConfig::default()
    };
    let _ = run(&mut state, &config);

    let address = words[0];
    let _ = validate_fetch(&state.memory, address);
    let _ = read_u32_be(&state.memory, address);
});
