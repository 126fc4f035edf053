// SPDX-License-Identifier: Apache-2.0

// Example feeding a document through small reads and small buffers.
// Run with RUST_LOG=debug to watch the switch into and out of chain mode.

use std::convert::Infallible;

use jsonreel::{
    deserialize_with_options, BufferPool, ChunkReader, DeserializeError, Options, ParseError,
    StateMachine, Token, Tokens,
};

#[derive(Debug, Default)]
struct Order {
    id: i64,
    note: String,
    items: Vec<String>,
}

/// Cursor states: 0 before the object, 1 expecting a key or the end,
/// 2/3 expecting the `id`/`note` value, 4 expecting the `items` array,
/// 5 inside it.
struct OrderMachine;

impl StateMachine<Order> for OrderMachine {
    fn resume(
        &mut self,
        order: &mut Order,
        tokens: &mut Tokens<'_>,
        cursor: &mut i32,
    ) -> Result<bool, ParseError> {
        while let Some(token) = tokens.next_token()? {
            *cursor = match (*cursor, token) {
                (0, Token::StartObject) => 1,
                (1, Token::PropertyName(key)) => match &*key {
                    "id" => 2,
                    "note" => 3,
                    "items" => 4,
                    _ => return Err(tokens.unexpected("id, note or items")),
                },
                (1, Token::EndObject) => return Ok(true),
                (2, Token::Number(n)) => {
                    order.id = n.as_i64().ok_or_else(|| tokens.overflow())?;
                    1
                }
                (3, Token::String(s)) => {
                    order.note = s.into_owned();
                    1
                }
                (4, Token::StartArray) => 5,
                (5, Token::String(s)) => {
                    order.items.push(s.into_owned());
                    5
                }
                (5, Token::EndArray) => 1,
                _ => return Err(tokens.unexpected("an order")),
            };
        }
        Ok(false)
    }
}

fn main() -> Result<(), DeserializeError<Infallible>> {
    env_logger::init();

    let note = "handle with care, ".repeat(8);
    let json = format!(
        r#"{{"id": 1042, "note": "{}", "items": ["bolt", "nut", "washeré"]}}"#,
        note
    );
    println!("Input: {} bytes", json.len());

    let pool = BufferPool::new();
    let options = Options::new()
        .with_initial_buffer_size(32)
        .with_segment_size(32);
    let reader = ChunkReader::new(json.as_bytes(), 8);

    let order = deserialize_with_options(reader, Order::default(), OrderMachine, options, &pool)?;
    println!("Order {}: {} items", order.id, order.items.len());
    println!("  note: {} chars", order.note.len());
    for item in &order.items {
        println!("  item: {}", item);
    }

    // The 144-byte note outgrows a 32-byte buffer, so several were borrowed.
    let stats = pool.stats();
    println!(
        "Pool: {} acquired, {} released, {} allocated, {} outstanding",
        stats.acquired, stats.released, stats.allocated, stats.outstanding
    );
    Ok(())
}
