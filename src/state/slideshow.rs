// Slideshow scheduling.
// Paginates the display sequence and drives a single self-rescheduling page timer.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

use super::reconcile::{DisplayItem, DisplaySequence};

/// Photos shown per page.
pub const PAGE_SIZE: usize = 15;
/// Shortest allowed time per page, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 10;
/// Longest allowed time per page, in seconds.
pub const MAX_INTERVAL_SECS: u64 = 35;

/// Clamp a page interval to the allowed range.
pub fn clamp_interval(seconds: u64) -> u64 {
    seconds.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
}

/// Number of pages needed for `len` photos.
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowState {
    Idle,
    Running,
}

/// Manual navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// A fixed-size page of the sequence; short pages are padded with `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub index: usize,
    pub total: usize,
    pub slots: Vec<Option<&'a DisplayItem>>,
}

/// Receives rendered pages.
pub trait PageRenderer {
    /// Show a whole page, replacing what was shown before.
    fn render_page(&mut self, page: &Page<'_>);

    /// Replace one slot of the page currently shown.
    fn render_slot(&mut self, slot: usize, item: &DisplayItem);
}

/// Paginated slideshow with one pending page-turn deadline.
///
/// The deadline is single-shot: each page turn arms the next one from the
/// current interval, so interval changes apply to the very next turn.
#[derive(Debug)]
pub struct Slideshow<R> {
    state: SlideshowState,
    sequence: DisplaySequence,
    current_page: usize,
    interval: Duration,
    next_turn: Option<Instant>,
    /// Finished downloads by url, replayed onto sequences built before they landed.
    backfilled: HashMap<String, String>,
    renderer: R,
}

impl<R: PageRenderer> Slideshow<R> {
    pub fn new(renderer: R, interval_secs: u64) -> Self {
        Self {
            state: SlideshowState::Idle,
            sequence: DisplaySequence::default(),
            current_page: 0,
            interval: Duration::from_secs(clamp_interval(interval_secs)),
            next_turn: None,
            backfilled: HashMap::new(),
            renderer,
        }
    }

    pub fn state(&self) -> SlideshowState {
        self.state
    }

    pub fn sequence(&self) -> &DisplaySequence {
        &self.sequence
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        page_count(self.sequence.len())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// When the next page turn is due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_turn
    }

    /// Number of armed timers; never more than one.
    pub fn armed_timers(&self) -> usize {
        usize::from(self.next_turn.is_some())
    }

    /// Show page 0 of `sequence` and start turning pages.
    pub fn start(&mut self, sequence: DisplaySequence, now: Instant) {
        self.cancel_timer();
        self.sequence = sequence;
        self.replay_backfills();
        self.state = SlideshowState::Running;
        self.current_page = 0;
        self.render_current();
        if self.total_pages() > 1 {
            self.arm(now);
        }
        tracing::info!(photos = self.sequence.len(), pages = self.total_pages(), "slideshow started");
    }

    /// Swap in a new sequence without restarting the show.
    ///
    /// The current page and pending deadline are kept unless the page no
    /// longer exists, in which case the show goes back to page 0.
    pub fn update_sequence(&mut self, sequence: DisplaySequence, now: Instant) {
        if self.state == SlideshowState::Idle {
            self.sequence = sequence;
            self.replay_backfills();
            return;
        }

        let before = self.page_items(self.current_page);
        self.sequence = sequence;
        self.replay_backfills();
        let total = self.total_pages();

        if self.current_page >= total.max(1) {
            self.current_page = 0;
            self.render_current();
        } else if self.page_items(self.current_page) != before {
            self.render_current();
        }

        if total > 1 && self.next_turn.is_none() {
            self.arm(now);
        } else if total <= 1 {
            self.cancel_timer();
        }
    }

    /// Stop turning pages.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.state = SlideshowState::Idle;
    }

    /// Turn the page if the deadline has passed. Returns whether it turned.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.next_turn {
            Some(deadline) if deadline <= now && self.state == SlideshowState::Running => {
                self.next_turn = None;
                let total = self.total_pages();
                if total <= 1 {
                    return false;
                }
                self.current_page = (self.current_page + 1) % total;
                self.render_current();
                self.arm(now);
                true
            }
            _ => false,
        }
    }

    /// Jump to the adjacent page and restart the countdown.
    pub fn navigate(&mut self, direction: Direction, now: Instant) -> bool {
        let total = self.total_pages();
        if self.state != SlideshowState::Running || total <= 1 {
            return false;
        }

        self.current_page = match direction {
            Direction::Next => (self.current_page + 1) % total,
            Direction::Previous => (self.current_page + total - 1) % total,
        };
        self.render_current();
        self.arm(now);
        true
    }

    /// Change the page interval. Returns the clamped value in seconds.
    ///
    /// A running multi-page show re-arms at once with the new duration.
    pub fn set_interval(&mut self, seconds: u64, now: Instant) -> u64 {
        let seconds = clamp_interval(seconds);
        self.interval = Duration::from_secs(seconds);
        if self.state == SlideshowState::Running && self.total_pages() > 1 {
            self.arm(now);
        }
        seconds
    }

    /// A background download finished; point its slots at the cache.
    ///
    /// Slots on the page being shown are re-rendered individually. The event
    /// is also kept for the next sequence, which may have been built before
    /// the download finished.
    pub fn apply_backfill(&mut self, url: &str, id: &str) {
        self.backfilled.insert(url.to_string(), id.to_string());
        let changed = self.sequence.mark_cached(url, id);
        if self.state != SlideshowState::Running {
            return;
        }

        let page_start = self.current_page * PAGE_SIZE;
        for position in changed {
            if (page_start..page_start + PAGE_SIZE).contains(&position) {
                if let Some(item) = self.sequence.items().get(position) {
                    self.renderer.render_slot(position - page_start, item);
                }
            }
        }
    }

    /// Build page `index` of the current sequence.
    pub fn page(&self, index: usize) -> Page<'_> {
        let items = self.sequence.items();
        let start = index * PAGE_SIZE;
        let slots = (start..start + PAGE_SIZE).map(|i| items.get(i)).collect();
        Page {
            index,
            total: self.total_pages(),
            slots,
        }
    }

    /// Point remote slots of a fresh sequence at downloads that already finished.
    ///
    /// Entries whose url left the sequence are forgotten.
    fn replay_backfills(&mut self) {
        for (url, id) in &self.backfilled {
            self.sequence.mark_cached(url, id);
        }
        let present: HashSet<&str> = self.sequence.items().iter().map(|i| i.url.as_str()).collect();
        self.backfilled.retain(|url, _| present.contains(url.as_str()));
    }

    fn page_items(&self, index: usize) -> Vec<Option<DisplayItem>> {
        self.page(index).slots.into_iter().map(|slot| slot.cloned()).collect()
    }

    fn render_current(&mut self) {
        let items = self.sequence.items();
        let start = self.current_page * PAGE_SIZE;
        let page = Page {
            index: self.current_page,
            total: page_count(items.len()),
            slots: (start..start + PAGE_SIZE).map(|i| items.get(i)).collect(),
        };
        self.renderer.render_page(&page);
    }

    /// Replace any pending deadline with one `interval` from `now`.
    fn arm(&mut self, now: Instant) {
        self.next_turn = Some(now + self.interval);
    }

    fn cancel_timer(&mut self) {
        self.next_turn = None;
    }
}
