//! Miniature C preprocessor
//!
//! Drives the line classifier, the conditional stack and the define registry
//! for one source file. Only what the field mapper needs is modelled:
//! - `#define` / `#undef` in active regions update the registry
//! - `#if` / `#ifdef` / `#ifndef` / `#elif` / `#else` / `#endif` gate lines
//! - everything else (`#include`, `#error`, code) is ignored
//!
//! Malformed nesting never aborts processing; it is reported and tolerated.

pub mod conditional;
pub mod expression;
pub mod lines;
pub mod literal;
pub mod registry;

pub use conditional::{ConditionalFrame, ConditionalStack, FrameKind};
pub use expression::{evaluate_condition, ExpressionError};
pub use lines::{strip_block_comments, DefineLine, Directive, LineClassifier, LineKind, SourceLine};
pub use registry::{is_identifier, DefineRegistry};

use crate::diagnostics::{DebugKind, DebugLog, Warning, WarningLevel};

/// Per-file preprocessing state
#[derive(Debug)]
pub struct Preprocessor {
    registry: DefineRegistry,
    stack: ConditionalStack,
    file: String,
    warnings: Vec<Warning>,
}

impl Preprocessor {
    /// Start a file with an existing registry (fresh or carried over)
    pub fn new(registry: DefineRegistry, file: &str) -> Self {
        Self {
            registry,
            stack: ConditionalStack::new(),
            file: file.to_string(),
            warnings: Vec::new(),
        }
    }

    /// Defines registered so far
    pub fn registry(&self) -> &DefineRegistry {
        &self.registry
    }

    /// The current line is in an active region
    pub fn is_active(&self) -> bool {
        self.stack.is_active()
    }

    /// Handle one classified line.
    ///
    /// Returns the define when the line is an object-like `#define` in an
    /// active region; it has already been registered.
    pub fn process<'l>(&mut self, line: &'l SourceLine, log: &mut DebugLog) -> Option<&'l DefineLine> {
        match &line.kind {
            LineKind::Define(define) => self.define(line.number, define, log),
            LineKind::Directive(directive) => {
                self.directive(line.number, directive, log);
                None
            }
            LineKind::Blank | LineKind::Comment | LineKind::Other => None,
        }
    }

    fn define<'l>(&mut self, number: usize, define: &'l DefineLine, log: &mut DebugLog) -> Option<&'l DefineLine> {
        if !self.stack.is_active() {
            return None;
        }

        self.registry.define(&define.name, define.value.as_deref());
        log.push(
            DebugKind::DefineFound,
            Some(number),
            match &define.value {
                Some(value) => format!("#define {} {}", define.name, value),
                None if define.function_like => format!("#define {}(...)", define.name),
                None => format!("#define {}", define.name),
            },
        );

        (!define.function_like).then_some(define)
    }

    fn directive(&mut self, number: usize, directive: &Directive, log: &mut DebugLog) {
        match directive {
            Directive::Ifdef(name) | Directive::Ifndef(name) => {
                let (kind, keyword) = match directive {
                    Directive::Ifdef(_) => (FrameKind::Ifdef, "#ifdef"),
                    _ => (FrameKind::Ifndef, "#ifndef"),
                };
                if name.is_empty() && self.stack.is_active() {
                    self.malformed(number, format!("{} without an identifier", keyword), log);
                }
                let registry = &self.registry;
                let taken = self.stack.push(kind, number, || {
                    !name.is_empty() && (registry.is_defined(name) == (kind == FrameKind::Ifdef))
                });
                self.report_branch(number, &format!("{} {}", keyword, name), taken, log);
            }
            Directive::If(expr) => {
                let registry = &self.registry;
                let taken = self
                    .stack
                    .push(FrameKind::If, number, || condition(expr, registry, number, log));
                self.report_branch(number, &format!("#if {}", expr), taken, log);
            }
            Directive::Elif(expr) => {
                let registry = &self.registry;
                match self.stack.elif(|| condition(expr, registry, number, log)) {
                    Some(taken) => self.report_branch(number, &format!("#elif {}", expr), taken, log),
                    None => self.malformed(number, "#elif without #if".to_string(), log),
                }
            }
            Directive::Else => match self.stack.else_branch() {
                Some(taken) => self.report_branch(number, "#else", taken, log),
                None => self.malformed(number, "#else without #if".to_string(), log),
            },
            Directive::Endif => match self.stack.endif() {
                Some(_) => log.push(
                    DebugKind::Directive,
                    Some(number),
                    format!("#endif (depth {})", self.stack.depth()),
                ),
                None => self.malformed(number, "#endif without #if".to_string(), log),
            },
            Directive::Undef(name) => {
                if self.stack.is_active() && self.registry.undefine(name) {
                    log.push(DebugKind::Undefined, Some(number), format!("#undef {}", name));
                }
            }
            Directive::Other { keyword, rest } => {
                if self.stack.is_active() {
                    log.push(
                        DebugKind::Directive,
                        Some(number),
                        format!("#{} {}", keyword, rest).trim_end().to_string(),
                    );
                }
            }
        }
    }

    /// Log the outcome of a branch directive. A skip is reported only where
    /// it starts, not for every nested frame inside an already skipped region.
    fn report_branch(&self, number: usize, directive: &str, taken: bool, log: &mut DebugLog) {
        let live = self
            .stack
            .open_frames()
            .last()
            .is_some_and(ConditionalFrame::is_live);
        if taken {
            log.push(DebugKind::Directive, Some(number), format!("{} -> active", directive));
        } else if live {
            log.push(
                DebugKind::ConditionalSkip,
                Some(number),
                format!("{} -> skipped", directive),
            );
        }
    }

    fn malformed(&mut self, number: usize, message: String, log: &mut DebugLog) {
        tracing::warn!("{}:{}: {}", self.file, number, message);
        log.push(DebugKind::Malformed, Some(number), message.clone());
        self.warnings.push(Warning::new(
            WarningLevel::Info,
            format!("{}:{}: {}", self.file, number, message),
        ));
    }

    /// Close the file: report unterminated blocks and hand back the registry
    /// and any malformed-input warnings.
    pub fn finish(mut self, log: &mut DebugLog) -> (DefineRegistry, Vec<Warning>) {
        let open: Vec<usize> = self.stack.open_frames().iter().map(|f| f.line).collect();
        for line in open {
            self.malformed(line, "conditional block not closed before end of file".to_string(), log);
        }
        self.stack.reset();
        (self.registry, self.warnings)
    }
}

/// Evaluate a condition, failing closed on any error
fn condition(expr: &str, registry: &DefineRegistry, number: usize, log: &mut DebugLog) -> bool {
    match evaluate_condition(expr, registry) {
        Ok(value) => value,
        Err(e) => {
            log.push(
                DebugKind::ExpressionError,
                Some(number),
                format!("'{}': {} (treated as false)", expr, e),
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> (DefineRegistry, Vec<Warning>, DebugLog) {
        let stripped = strip_block_comments(src);
        let mut pp = Preprocessor::new(DefineRegistry::new(), "test.h");
        let mut log = DebugLog::new(Some("test.h"), true);
        for line in LineClassifier::new(&stripped) {
            pp.process(&line, &mut log);
        }
        let (registry, warnings) = pp.finish(&mut log);
        (registry, warnings, log)
    }

    #[test]
    fn test_only_active_defines_registered() {
        let (reg, warnings, _) = run(
            "#define A\n#ifdef A\n#define IN_A 1\n#else\n#define NOT_A 1\n#endif\n#ifndef B\n#define NO_B\n#endif\n",
        );
        assert!(reg.is_defined("IN_A"));
        assert!(!reg.is_defined("NOT_A"));
        assert!(reg.is_defined("NO_B"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_undef_only_in_active_region() {
        let (reg, _, log) = run("#define X 1\n#if 0\n#undef X\n#endif\n#define Y\n#undef Y\n");
        assert_eq!(reg.value("X"), Some("1"));
        assert!(!reg.is_defined("Y"));
        assert!(log.entries().iter().any(|e| e.kind == DebugKind::Undefined));
    }

    #[test]
    fn test_expression_error_is_false_and_logged() {
        let (reg, _, log) = run("#if PIN_EXISTS(PS_ON)\n#define PSU\n#else\n#define NO_PSU\n#endif\n");
        assert!(!reg.is_defined("PSU"));
        assert!(reg.is_defined("NO_PSU"));
        assert!(log.entries().iter().any(|e| e.kind == DebugKind::ExpressionError && e.line == Some(1)));
    }

    #[test]
    fn test_malformed_nesting_tolerated() {
        let (reg, warnings, log) = run("#endif\n#else\n#define A\n#ifdef A\n#define B\n");
        assert!(reg.is_defined("A"));
        assert!(reg.is_defined("B"));
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.level == WarningLevel::Info));
        assert!(warnings[2].message.contains("test.h:4"));
        let malformed = log.entries().iter().filter(|e| e.kind == DebugKind::Malformed).count();
        assert_eq!(malformed, 3);
    }

    #[test]
    fn test_function_like_registered_not_returned() {
        let stripped = strip_block_comments("#define SQ(x) ((x)*(x))\n#define N 3\n");
        let lines: Vec<_> = LineClassifier::new(&stripped).collect();
        let mut pp = Preprocessor::new(DefineRegistry::new(), "f.h");
        let mut log = DebugLog::new(None, false);
        assert!(pp.process(&lines[0], &mut log).is_none());
        assert_eq!(pp.process(&lines[1], &mut log).map(|d| d.name.as_str()), Some("N"));
        assert!(pp.registry().is_defined("SQ"));
    }

    #[test]
    fn test_skip_reported_once_per_region() {
        let (_, _, log) = run("#if 0\n#ifdef A\n#endif\n#endif\n");
        let skips = log
            .entries()
            .iter()
            .filter(|e| e.kind == DebugKind::ConditionalSkip)
            .count();
        assert_eq!(skips, 1);
    }
}
