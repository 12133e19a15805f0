use core_engine::{Cursor, Engine, EngineConfig};

/// Engine whose current buffer holds `lines`, with a clean undo history
/// and an unmodified flag, cursor at (1, 0).
pub fn engine_with(lines: &[&str]) -> Engine {
    engine_with_config(lines, EngineConfig::default())
}

pub fn engine_with_config(lines: &[&str], config: EngineConfig) -> Engine {
    let mut engine = Engine::with_config(config);
    let id = engine.current_buffer();
    let buffer = engine.buffer_mut(id).unwrap();
    buffer.set_lines(.., lines.iter().map(|s| s.to_string()).collect());
    buffer.clear_history();
    buffer.mark_saved();
    buffer.cursor = Cursor::new(1, 0);
    engine
}

/// Feeds keys one at a time; `<named>` keys (e.g. `<esc>`, `<cr>`) are sent
/// as a unit. A `<` with no closing `>` ahead is an ordinary key, so
/// sequences like `<<` dedent instead of being swallowed as a name.
pub fn feed(engine: &mut Engine, keys: &str) {
    let mut rest = keys;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest.find('>')
        {
            engine.input(&rest[..=close]);
            rest = &rest[close + 1..];
        } else {
            engine.input(&c.to_string());
            rest = &rest[c.len_utf8()..];
        }
    }
}

pub fn lines(engine: &Engine) -> Vec<String> {
    engine
        .buffer(engine.current_buffer())
        .unwrap()
        .lines()
        .to_vec()
}

pub fn line(engine: &Engine, lnum: usize) -> String {
    engine
        .buffer(engine.current_buffer())
        .unwrap()
        .line(lnum)
        .to_string()
}

pub fn cursor(engine: &Engine) -> (usize, usize) {
    let c = engine.cursor();
    (c.row, c.col)
}
