//! The dual-mode tag parser.
//!
//! A single per-character transition function drives both forms: `feed`
//! (incremental, emits a full snapshot after every character) and
//! `parse_complete` (batch, same transitions without snapshot copies), so a
//! chunked parse and a whole-string parse agree for every input and every
//! chunking.

use std::sync::Arc;

use super::{
    registry::TagRegistry,
    types::{ContentBlock, TextBlock, ToolInvocation},
};

/// Incremental parser state for one logical turn.
///
/// The accumulation buffer persists across `feed` calls, so a tag split
/// across chunk boundaries is completed on a later character within the same
/// buffer; no carry-over handling is needed.
#[derive(Debug)]
pub struct TagStreamParser {
    registry: Arc<TagRegistry>,

    /// Raw characters seen since the last reset
    accumulator: String,

    /// Closed blocks, in order of completion
    finalized: Vec<ContentBlock>,

    /// At most one open text block; byte offset of its first character
    open_text: Option<TextBlock>,
    text_start: usize,

    /// At most one open tool invocation; byte offset just past its opening tag
    open_tool: Option<ToolInvocation>,
    tool_start: usize,

    /// Index into the registry's params of the capturing parameter, if any;
    /// byte offset just past its opening tag
    open_param: Option<usize>,
    param_start: usize,
}

impl TagStreamParser {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self {
            registry,
            accumulator: String::new(),
            finalized: Vec::new(),
            open_text: None,
            text_start: 0,
            open_tool: None,
            tool_start: 0,
            open_param: None,
            param_start: 0,
        }
    }

    /// Discard all accumulated state. The next snapshot is empty.
    pub fn reset(&mut self) {
        self.accumulator.clear();
        self.finalized.clear();
        self.open_text = None;
        self.text_start = 0;
        self.open_tool = None;
        self.tool_start = 0;
        self.open_param = None;
        self.param_start = 0;
    }

    /// Feed a chunk, returning one complete snapshot per character consumed.
    ///
    /// Snapshots are self-contained: every finalized block so far plus the
    /// currently open block. Emitting the whole list per character trades
    /// repeated linear copies for trivially verifiable correctness.
    pub fn feed(&mut self, chunk: &str) -> Vec<Vec<ContentBlock>> {
        let mut snapshots = Vec::with_capacity(chunk.chars().count());
        for ch in chunk.chars() {
            self.process_char(ch);
            snapshots.push(self.snapshot());
        }
        snapshots
    }

    /// Current snapshot: finalized blocks plus whatever block is open.
    pub fn snapshot(&self) -> Vec<ContentBlock> {
        let mut blocks = self.finalized.clone();
        if let Some(tool) = &self.open_tool {
            blocks.push(ContentBlock::ToolUse(tool.clone()));
        }
        if let Some(text) = &self.open_text {
            blocks.push(ContentBlock::Text(text.clone()));
        }
        blocks
    }

    /// End of stream: any open block is appended as-is, still partial. An
    /// unclosed parameter keeps its captured-so-far value. There is no
    /// implicit forced closing tag.
    pub fn finalize(mut self) -> Vec<ContentBlock> {
        if let Some(mut tool) = self.open_tool.take() {
            if let Some(idx) = self.open_param.take() {
                let value = self.accumulator[self.param_start..].trim().to_string();
                tool.params.insert(self.registry.params[idx].name.clone(), value);
            }
            self.finalized.push(ContentBlock::ToolUse(tool));
        }
        if let Some(text) = self.open_text.take() {
            self.finalized.push(ContentBlock::Text(text));
        }
        self.finalized
    }

    fn process_char(&mut self, ch: char) {
        self.accumulator.push(ch);

        if self.open_tool.is_some() {
            if self.open_param.is_some() {
                self.step_in_param();
            } else {
                self.step_in_tool();
            }
        } else {
            self.step_in_text(ch);
        }
    }

    /// A parameter is capturing: close it when the buffer slice since its
    /// start ends with its closing tag, otherwise keep accumulating.
    fn step_in_param(&mut self) {
        let idx = self.open_param.expect("param is open");
        let close_tag = &self.registry.params[idx].close_tag;
        let value = &self.accumulator[self.param_start..];
        if value.ends_with(close_tag.as_str()) {
            let raw = &value[..value.len() - close_tag.len()];
            let name = self.registry.params[idx].name.clone();
            let trimmed = raw.trim().to_string();
            self.open_tool
                .as_mut()
                .expect("tool is open while capturing a param")
                .params
                .insert(name, trimmed);
            self.open_param = None;
        }
    }

    /// Inside a tool invocation with no parameter capturing: the tool's own
    /// closing tag wins, then parameter opening tags in declaration order,
    /// then bulk-content recovery.
    fn step_in_tool(&mut self) {
        let tool_name = self.open_tool.as_ref().expect("tool is open").name.clone();
        let close_tag = self
            .registry
            .tools
            .iter()
            .find(|t| t.name == tool_name)
            .expect("open tool name came from the registry")
            .close_tag
            .clone();

        if self.accumulator[self.tool_start..].ends_with(close_tag.as_str()) {
            let mut tool = self.open_tool.take().expect("tool is open");
            tool.partial = false;
            self.finalized.push(ContentBlock::ToolUse(tool));
            return;
        }

        for (idx, param) in self.registry.params.iter().enumerate() {
            if self.accumulator.ends_with(param.open_tag.as_str()) {
                self.open_param = Some(idx);
                self.param_start = self.accumulator.len();
                return;
            }
        }

        self.recover_bulk_param();
    }

    /// The designated bulk parameter's value may itself contain tag-like
    /// text, so its strict suffix-matched capture can close early. Whenever
    /// the buffer ends with the bulk closing tag, recapture the value as the
    /// substring between the first opening tag and the last closing tag
    /// within the invocation's accumulated text, overwriting the early
    /// capture.
    fn recover_bulk_param(&mut self) {
        let Some(bulk_idx) = self.registry.bulk_param else {
            return;
        };
        let bulk = &self.registry.params[bulk_idx];
        if !self.accumulator.ends_with(bulk.close_tag.as_str()) {
            return;
        }

        let tool_text = &self.accumulator[self.tool_start..];
        let Some(open_at) = tool_text.find(bulk.open_tag.as_str()) else {
            return;
        };
        let value_start = open_at + bulk.open_tag.len();
        let Some(value_end) = tool_text.rfind(bulk.close_tag.as_str()) else {
            return;
        };
        if value_end > value_start {
            let value = tool_text[value_start..value_end].trim().to_string();
            self.open_tool
                .as_mut()
                .expect("tool is open")
                .params
                .insert(bulk.name.clone(), value);
        }
    }

    /// Free text: a registered tool opening tag as the buffer suffix starts
    /// an invocation and closes the open text block (stripping the tag text
    /// from its trailing edge); anything else extends the text block.
    fn step_in_text(&mut self, ch: char) {
        for tool in &self.registry.tools {
            if self.accumulator.ends_with(tool.open_tag.as_str()) {
                self.open_tool = Some(ToolInvocation::open(tool.name.clone()));
                self.tool_start = self.accumulator.len();

                if let Some(mut text) = self.open_text.take() {
                    text.partial = false;
                    // The final '>' was never added to the text content, so
                    // the partial tag suffix is the opening tag minus one.
                    let cut = tool.open_tag.len() - 1;
                    text.content.truncate(text.content.len().saturating_sub(cut));
                    text.content = text.content.trim().to_string();
                    self.finalized.push(ContentBlock::Text(text));
                }
                return;
            }
        }

        if self.open_text.is_none() {
            self.text_start = self.accumulator.len() - ch.len_utf8();
        }
        self.open_text = Some(TextBlock {
            content: self.accumulator[self.text_start..].trim().to_string(),
            partial: true,
        });
    }
}

/// Batch parse of a whole string, identical in output to feeding the same
/// string through `feed` (in any chunking) followed by `finalize`.
pub fn parse_complete(registry: Arc<TagRegistry>, text: &str) -> Vec<ContentBlock> {
    let mut parser = TagStreamParser::new(registry);
    for ch in text.chars() {
        parser.process_char(ch);
    }
    parser.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<TagRegistry> {
        Arc::new(
            TagRegistry::builder()
                .tool("search")
                .tool("write_to_file")
                .param("content")
                .bulk_param("content")
                .build()
                .unwrap(),
        )
    }

    fn text(content: &str, partial: bool) -> ContentBlock {
        ContentBlock::Text(TextBlock {
            content: content.to_string(),
            partial,
        })
    }

    fn tool(name: &str, params: &[(&str, &str)], partial: bool) -> ContentBlock {
        ContentBlock::ToolUse(ToolInvocation {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            partial,
        })
    }

    #[test]
    fn plain_text_stays_open_until_finalize() {
        let blocks = parse_complete(registry(), "Hello, world!");
        assert_eq!(blocks, vec![text("Hello, world!", true)]);
    }

    #[test]
    fn tool_between_text() {
        let blocks = parse_complete(registry(), "Before tool <search>query</search> after tool.");
        assert_eq!(
            blocks,
            vec![
                text("Before tool", false),
                tool("search", &[], false),
                text("after tool.", true),
            ]
        );
    }

    #[test]
    fn tool_with_content_param() {
        let blocks = parse_complete(
            registry(),
            "Before file <write_to_file><content>This is file content</content></write_to_file> after file.",
        );
        assert_eq!(
            blocks,
            vec![
                text("Before file", false),
                tool("write_to_file", &[("content", "This is file content")], false),
                text("after file.", true),
            ]
        );
    }

    #[test]
    fn doubled_content_tags_recovered_first_open_last_close() {
        let blocks = parse_complete(
            registry(),
            "Before file <write_to_file><content><content>This is file content</content></content></write_to_file> after file.",
        );
        assert_eq!(
            blocks,
            vec![
                text("Before file", false),
                tool(
                    "write_to_file",
                    &[("content", "<content>This is file content</content>")],
                    false,
                ),
                text("after file.", true),
            ]
        );
    }

    #[test]
    fn unregistered_tag_is_literal_text() {
        let blocks = parse_complete(registry(), "see <nonsense>stuff</nonsense> here");
        assert_eq!(blocks, vec![text("see <nonsense>stuff</nonsense> here", true)]);
    }

    #[test]
    fn unclosed_tool_finalizes_partial() {
        let blocks = parse_complete(registry(), "go <search>never closed");
        assert_eq!(blocks, vec![text("go", false), tool("search", &[], true)]);
    }

    #[test]
    fn unclosed_param_keeps_captured_value() {
        let blocks = parse_complete(registry(), "<write_to_file><content>half a file");
        assert_eq!(
            blocks,
            vec![
                text("", false),
                tool("write_to_file", &[("content", "half a file")], true),
            ]
        );
    }

    #[test]
    fn param_value_is_trimmed() {
        let blocks = parse_complete(
            registry(),
            "<write_to_file><content>  padded  </content></write_to_file>",
        );
        assert_eq!(
            blocks,
            vec![
                text("", false),
                tool("write_to_file", &[("content", "padded")], false),
            ]
        );
    }

    #[test]
    fn feed_emits_one_snapshot_per_char() {
        let mut parser = TagStreamParser::new(registry());
        let snapshots = parser.feed("ab");
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0], vec![text("a", true)]);
        assert_eq!(snapshots[1], vec![text("ab", true)]);
    }

    #[test]
    fn tag_split_across_feeds_still_matches() {
        let mut parser = TagStreamParser::new(registry());
        parser.feed("hi <sea");
        parser.feed("rch>q</se");
        parser.feed("arch> bye");
        let blocks = parser.finalize();
        assert_eq!(
            blocks,
            vec![text("hi", false), tool("search", &[], false), text("bye", true)]
        );
    }

    #[test]
    fn reset_discards_all_state() {
        let mut parser = TagStreamParser::new(registry());
        parser.feed("Hello, ");
        parser.reset();
        assert!(parser.snapshot().is_empty());
        parser.feed("World!");
        assert_eq!(parser.finalize(), parse_complete(registry(), "World!"));
    }

    #[test]
    fn open_snapshot_shows_partial_tool() {
        let mut parser = TagStreamParser::new(registry());
        parser.feed("x <search>par");
        assert_eq!(
            parser.snapshot(),
            vec![text("x", false), tool("search", &[], true)]
        );
    }

    #[test]
    fn overlapping_names_resolve_by_declaration_order() {
        // "to_file" is a suffix of "write_to_file"; candidates are tried in
        // declaration order so the longer, earlier-declared name matches.
        let registry = Arc::new(
            TagRegistry::builder()
                .tool("write_to_file")
                .tool("to_file")
                .build()
                .unwrap(),
        );
        let blocks = parse_complete(registry, "<write_to_file></write_to_file>");
        assert_eq!(blocks, vec![text("", false), tool("write_to_file", &[], false)]);
    }

    #[test]
    fn adjacent_tools_produce_empty_text_between() {
        // The original parser finalizes a zero-length text block for the
        // partially accumulated tag text; preserved for batch/stream parity.
        let blocks = parse_complete(registry(), "<search></search><search></search>");
        assert_eq!(
            blocks,
            vec![
                text("", false),
                tool("search", &[], false),
                text("", false),
                tool("search", &[], false),
            ]
        );
    }

    #[test]
    fn chunked_feed_matches_batch_for_all_sizes() {
        let message =
            "Before file <write_to_file><content>This is file content</content></write_to_file> after file.";
        let expected = parse_complete(registry(), message);

        for chunk_size in [1usize, 3, 10, message.len()] {
            let mut parser = TagStreamParser::new(registry());
            let chars: Vec<char> = message.chars().collect();
            for chunk in chars.chunks(chunk_size) {
                parser.feed(&chunk.iter().collect::<String>());
            }
            assert_eq!(parser.finalize(), expected, "chunk size {}", chunk_size);
        }
    }
}
