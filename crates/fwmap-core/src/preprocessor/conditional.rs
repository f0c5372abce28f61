//! Conditional-compilation state
//!
//! A stack of open `#if`/`#ifdef`/`#ifndef` frames plus a skip-depth counter.
//! A line is active iff the counter is zero. Each frame remembers whether it
//! is the one holding the counter up, so `#endif` releases exactly what its
//! own chain added.

/// Directive that opened a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `#if`
    If,
    /// `#ifdef`
    Ifdef,
    /// `#ifndef`
    Ifndef,
}

/// One open conditional chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalFrame {
    /// Directive that opened the chain
    pub kind: FrameKind,
    /// Line of the opening directive
    pub line: usize,
    /// A branch of this chain has already been taken
    pub taken: bool,
    /// Enclosing region was active when the frame was opened
    live: bool,
    /// This frame currently contributes to the skip depth
    skipping: bool,
}

impl ConditionalFrame {
    /// The enclosing region was active when the frame opened
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Open conditional chains of one file
#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    frames: Vec<ConditionalFrame>,
    skip_depth: usize,
}

impl ConditionalStack {
    /// An empty stack; every line is active
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame. `condition` is only evaluated when the enclosing region
    /// is active; inside a skipped region the new frame is dead.
    ///
    /// Returns whether the first branch is active.
    pub fn push(&mut self, kind: FrameKind, line: usize, condition: impl FnOnce() -> bool) -> bool {
        let live = self.is_active();
        let taken = live && condition();
        let skipping = !taken;
        if skipping {
            self.skip_depth += 1;
        }
        self.frames.push(ConditionalFrame {
            kind,
            line,
            taken,
            live,
            skipping,
        });
        taken
    }

    /// `#elif`. `None` when there is no open frame.
    ///
    /// The condition is evaluated only if no earlier branch of the chain was
    /// taken and the frame is live.
    pub fn elif(&mut self, condition: impl FnOnce() -> bool) -> Option<bool> {
        let frame = self.frames.last_mut()?;
        if !frame.live {
            return Some(false);
        }

        if !frame.taken && condition() {
            frame.taken = true;
            if frame.skipping {
                frame.skipping = false;
                self.skip_depth -= 1;
            }
            return Some(true);
        }

        if !frame.skipping {
            frame.skipping = true;
            self.skip_depth += 1;
        }
        Some(false)
    }

    /// `#else`. `None` when there is no open frame.
    pub fn else_branch(&mut self) -> Option<bool> {
        self.elif(|| true)
    }

    /// `#endif`. Popping an empty stack is a no-op and returns `None`.
    pub fn endif(&mut self) -> Option<ConditionalFrame> {
        let frame = self.frames.pop()?;
        if frame.skipping {
            self.skip_depth -= 1;
        }
        Some(frame)
    }

    /// Lines are currently active
    pub fn is_active(&self) -> bool {
        self.skip_depth == 0
    }

    /// Number of frames currently skipping
    pub fn skip_depth(&self) -> usize {
        self.skip_depth
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames still open, outermost first
    pub fn open_frames(&self) -> &[ConditionalFrame] {
        &self.frames
    }

    /// Drop every open frame
    pub fn reset(&mut self) {
        self.frames.clear();
        self.skip_depth = 0;
    }
}
