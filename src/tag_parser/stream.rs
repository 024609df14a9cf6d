//! Incremental parsing over a delta stream.

use std::sync::Arc;

use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};

use super::{parser::TagStreamParser, registry::TagRegistry, types::ContentBlock};

/// Input vocabulary of the streaming parser: text fragments plus the
/// discrete reset control signal instructing full state discard.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    Text(String),
    Reset,
}

/// Drive a `ParserEvent` stream through a fresh parser, yielding a complete
/// block snapshot after every consumed character (an empty snapshot after a
/// reset) and the final, partial-preserving block list once the source ends.
pub fn parse_tag_stream<S>(
    source: S,
    registry: Arc<TagRegistry>,
) -> impl Stream<Item = Vec<ContentBlock>>
where
    S: Stream<Item = ParserEvent>,
{
    stream! {
        let mut parser = TagStreamParser::new(registry);
        pin_mut!(source);
        while let Some(event) = source.next().await {
            match event {
                ParserEvent::Reset => {
                    parser.reset();
                    yield Vec::new();
                }
                ParserEvent::Text(text) => {
                    for snapshot in parser.feed(&text) {
                        yield snapshot;
                    }
                }
            }
        }
        yield parser.finalize();
    }
}
