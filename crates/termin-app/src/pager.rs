// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Maximum number of page links shown at once.
pub const WINDOW_SIZE: usize = 5;

pub fn total_pages(total: u64, page_size: usize) -> usize {
    let page_size = page_size.max(1) as u64;
    usize::try_from(total.div_ceil(page_size)).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageWindow {
    pub pages: Vec<usize>,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Page links around `current`. A single page yields an empty window.
    pub fn compute(total: u64, page_size: usize, current: usize) -> Self {
        let last = total_pages(total, page_size);
        if last <= 1 {
            return Self::default();
        }

        let span = WINDOW_SIZE - 1;
        let mut start = current.saturating_sub(2).max(1);
        let reach = start.saturating_add(span);
        let end = last.min(reach);
        if end < reach && start > 1 {
            start = end.saturating_sub(span).max(1);
        }

        Self {
            pages: (start..=end).collect(),
            has_prev: current > 1,
            has_next: current < last,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
