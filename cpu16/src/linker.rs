//! Resolves the parser's sentinels into a flat word stream, either in
//! place (`boot`) or behind a relocating loader (`loadable`).

use std::collections::HashMap;

use crate::error::LinkerError;
use crate::opcodes::{self, selector, POINTER_BIT};
use crate::parser::{ParseOutput, StreamItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Boot,
    Loadable,
}

/// Computes the address each declared variable lands at, given a base
/// address for the first one. Variables are laid out contiguously in
/// `alloc` declaration order; every sentinel referencing the same
/// variable resolves to the same address regardless of how many times it
/// is referenced.
fn layout_variables(output: &ParseOutput, base: u32) -> HashMap<String, u32> {
    let mut addresses = HashMap::new();
    let mut next = base;
    for name in &output.variable_order {
        addresses.insert(name.clone(), next);
        next += output.variables[name];
    }
    addresses
}

fn resolve_sentinel(
    name: &str,
    line: u32,
    labels: &HashMap<String, u32>,
    label_base: u32,
    variable_addresses: &HashMap<String, u32>,
) -> Result<u16, LinkerError> {
    if let Some(&offset) = labels.get(name) {
        Ok((label_base + offset) as u16)
    } else if let Some(&address) = variable_addresses.get(name) {
        Ok(address as u16)
    } else {
        let _ = line;
        Err(LinkerError {
            name: name.to_string(),
        })
    }
}

/// Links a boot-mode image: resolved code with no header and no loader.
fn link_boot(output: &ParseOutput) -> Result<Vec<u16>, LinkerError> {
    let code_size = output.stream.len() as u32;
    let variable_addresses = layout_variables(output, code_size);
    let mut words = Vec::with_capacity(output.stream.len());
    for item in &output.stream {
        match item {
            StreamItem::Word(w) => words.push(*w),
            StreamItem::UnresolvedName { name, line } => words.push(resolve_sentinel(
                name,
                *line,
                &output.labels,
                0,
                &variable_addresses,
            )?),
        }
    }
    Ok(words)
}

/// The fixed four-word relocation pattern emitted once per sentinel site,
/// after the single `pop a` that seeds the loader's base register.
fn loader_site(site_address: u16) -> [u16; 4] {
    [
        opcodes::encode_instruction(
            opcodes::primary::MOVE_HDD,
            opcodes::move_hdd_sub::MOVE,
            selector::B,
            selector::CONSTANT,
        ),
        site_address,
        opcodes::encode_instruction(
            opcodes::primary::ALU_WRITEBACK,
            alu_sub_add(),
            selector::B,
            selector::A,
        ),
        opcodes::encode_instruction(
            opcodes::primary::ALU_WRITEBACK,
            alu_sub_add(),
            POINTER_BIT | selector::B,
            selector::A,
        ),
    ]
}

fn alu_sub_add() -> u8 {
    opcodes::entry_for("add").expect("add is always in the opcode table").sub
}

/// Links a loadable-mode image: a two-word header, a relocating loader
/// (omitted entirely when there is nothing to relocate), then code with
/// every sentinel patched to its post-prepend address.
fn link_loadable(output: &ParseOutput) -> Result<Vec<u16>, LinkerError> {
    let code_size = output.stream.len() as u32;
    let sentinel_count = output
        .stream
        .iter()
        .filter(|i| matches!(i, StreamItem::UnresolvedName { .. }))
        .count() as u32;
    let loader_size = if sentinel_count == 0 {
        0
    } else {
        1 + 4 * sentinel_count
    };
    let free_memory = loader_size + code_size;
    let variable_addresses = layout_variables(output, free_memory);

    let mut code = Vec::with_capacity(output.stream.len());
    for item in &output.stream {
        match item {
            StreamItem::Word(w) => code.push(*w),
            StreamItem::UnresolvedName { name, line } => code.push(resolve_sentinel(
                name,
                *line,
                &output.labels,
                loader_size,
                &variable_addresses,
            )?),
        }
    }

    let program_length = 2 + loader_size + code_size;
    let total_variable_words: u32 = output.variables.values().sum();

    let mut image = Vec::with_capacity(2 + loader_size as usize + code.len());
    image.push(program_length as u16);
    image.push(total_variable_words as u16);

    if loader_size > 0 {
        image.push(opcodes::encode_instruction(
            opcodes::primary::STACK,
            opcodes::stack_sub::POP,
            selector::A,
            POINTER_BIT | selector::SP,
        ));

        // Each patch site's constant operand names the *runtime* address of
        // the code word it patches: the disk-only 2-word header is never
        // copied into RAM, so address 0 at runtime is the loader's first
        // word, same as the `loader_size + label_offset` convention used
        // to resolve label sentinels above. One loader block is emitted
        // per sentinel, in the order sentinels occur in the code.
        for (code_offset, item) in output.stream.iter().enumerate() {
            if matches!(item, StreamItem::UnresolvedName { .. }) {
                let patched_word_address = loader_size + code_offset as u32;
                image.extend(loader_site(patched_word_address as u16));
            }
        }
    }

    image.extend(code);
    Ok(image)
}

pub fn link(output: &ParseOutput, mode: Mode) -> Result<Vec<u16>, LinkerError> {
    match mode {
        Mode::Boot => link_boot(output),
        Mode::Loadable => link_loadable(output),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn parsed(src: &str) -> ParseOutput {
        parse(&lex(src).unwrap()).unwrap()
    }

    #[test]
    fn empty_program_in_loadable_mode_is_just_the_header() {
        let out = ParseOutput::default();
        let image = link(&out, Mode::Loadable).unwrap();
        assert_eq!(image, vec![2, 0]);
    }

    #[test]
    fn loadable_with_no_sentinels_has_no_loader() {
        let out = parsed("shutdown");
        let image = link(&out, Mode::Loadable).unwrap();
        // header(2) + code(1), no loader words in between.
        assert_eq!(image.len(), 3);
        assert_eq!(image[0], 3);
        assert_eq!(image[1], 0);
    }

    #[test]
    fn loadable_with_one_label_reference_gets_a_four_word_loader_plus_entry() {
        let out = parsed("jump here\n:here\nshutdown");
        let image = link(&out, Mode::Loadable).unwrap();
        // header(2) + loader(1 + 4*1 = 5) + code(3: jump word, constant, shutdown)
        assert_eq!(image.len(), 2 + 5 + 3);
        assert_eq!(image[0], image.len() as u16);
    }

    #[test]
    fn boot_mode_emits_no_header_and_resolves_labels_to_code_offsets() {
        let out = parsed("jump here\n:here\nshutdown");
        let image = link(&out, Mode::Boot).unwrap();
        assert_eq!(image.len(), 3);
        // The jump's trailing constant resolves to label "here"'s offset (1).
        assert_eq!(image[1], 1);
    }

    #[test]
    fn variable_addresses_follow_code_in_boot_mode() {
        let out = parsed("alloc counter 1\nmove [counter] 5");
        let image = link(&out, Mode::Boot).unwrap();
        // code is 2 words; the variable lives right after at offset 2.
        assert_eq!(image[1], 2);
    }

    #[test]
    fn unresolved_sentinel_surviving_to_link_time_is_a_linker_error() {
        let mut out = ParseOutput::default();
        out.stream.push(StreamItem::UnresolvedName {
            name: "ghost".to_string(),
            line: 1,
        });
        let err = link(&out, Mode::Boot).unwrap_err();
        assert_eq!(err.name, "ghost");
    }
}
