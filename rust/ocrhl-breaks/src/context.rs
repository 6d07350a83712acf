use std::ops::Range;

use ocrhl_source::SourceReader;

use crate::BreakLocator;

/// Moves up to `context_size` base boundaries at a time without leaving the unit
/// of an optional limit locator.
///
/// With a line locator as base and a block locator as limit, `following(x)` is the
/// start of the fifth line after `x` for a context size of 5, or the start of the
/// next block if that comes first.
pub struct ContextBreakLocator<'a> {
    base: Box<dyn BreakLocator + 'a>,
    limit: Option<Box<dyn BreakLocator + 'a>>,
    context_size: usize,
}

impl<'a> ContextBreakLocator<'a> {
    pub fn new(
        base: Box<dyn BreakLocator + 'a>,
        limit: Option<Box<dyn BreakLocator + 'a>>,
        context_size: usize,
    ) -> ContextBreakLocator<'a> {
        ContextBreakLocator {
            base,
            limit,
            context_size,
        }
    }

    pub fn base(&self) -> &dyn BreakLocator {
        self.base.as_ref()
    }

    pub fn limit(&self) -> Option<&dyn BreakLocator> {
        self.limit.as_deref()
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// The limit boundary after `offset`, or the end of the text.
    pub fn ceiling(&self, offset: u64) -> ocrhl_common::Result<u64> {
        match &self.limit {
            Some(limit) => limit.following(offset),
            None => Ok(self.text().len()),
        }
    }

    /// The limit boundary before `offset`, or 0.
    pub fn floor(&self, offset: u64) -> ocrhl_common::Result<u64> {
        match &self.limit {
            Some(limit) => limit.preceding(offset),
            None => Ok(0),
        }
    }

    /// Expands `match_range` to the base units around it, with `context_size`
    /// units on either side. See [`passage_bounds`].
    pub fn passage(&self, match_range: Range<u64>) -> ocrhl_common::Result<Range<u64>> {
        passage_bounds(self.base(), self, match_range)
    }
}

impl BreakLocator for ContextBreakLocator<'_> {
    fn following(&self, offset: u64) -> ocrhl_common::Result<u64> {
        let ceiling = self.ceiling(offset)?;
        let mut pos = offset;
        for _ in 0..self.context_size {
            let next = self.base.following(pos)?;
            if next >= ceiling {
                return Ok(ceiling);
            }
            pos = next;
        }
        Ok(pos)
    }

    fn preceding(&self, offset: u64) -> ocrhl_common::Result<u64> {
        let floor = self.floor(offset)?;
        let mut pos = offset;
        for _ in 0..self.context_size {
            let prev = self.base.preceding(pos)?;
            if prev <= floor {
                return Ok(floor);
            }
            pos = prev;
        }
        Ok(pos)
    }

    fn text(&self) -> &SourceReader {
        self.base.text()
    }
}

/// Byte range of the passage around `match_range`.
///
/// The match first grows to the base units it touches, `[base.preceding(s + 1),
/// base.following(e - 1))`, clamped to the limit unit of `context` around it.
/// The context locator then adds its units before and after, so a context size
/// of N yields up to 2N+1 base units, never crossing a limit boundary.
pub fn passage_bounds(
    base: &dyn BreakLocator,
    context: &ContextBreakLocator<'_>,
    match_range: Range<u64>,
) -> ocrhl_common::Result<Range<u64>> {
    let len = base.text().len();
    let start = match_range.start.min(len);
    let end = match_range.end.clamp(start, len).max(start + 1);

    let floor = context.floor(start + 1)?;
    let ceiling = context.ceiling(end - 1)?;
    let unit_start = base.preceding(start + 1)?.max(floor);
    let unit_end = base.following(end - 1)?.min(ceiling);

    let passage_start = context.preceding(unit_start)?.max(floor);
    let passage_end = context.following(unit_end)?.min(ceiling);
    Ok(passage_start..passage_end)
}
