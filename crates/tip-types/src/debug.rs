//! In-engine trace buffer shared by the collector and the solver.

use std::cell::RefCell;
use std::rc::Rc;

pub type SharedDebug = Rc<RefCell<DebugConfig>>;

/// Debug configuration for checker logging.
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub level: usize,
    pub max_depth: usize,
    pub logs: Vec<String>,
    pub log_unify: bool,
    pub log_constraints: bool,
    pub log_links: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            level: 1,
            max_depth: 64,
            logs: Vec::new(),
            log_unify: false,
            log_constraints: true,
            log_links: false,
        }
    }
}

impl DebugConfig {
    pub fn log(&mut self, depth: usize, lvl: usize, msg: impl Into<String>) {
        if lvl <= self.level && depth <= self.max_depth {
            self.logs.push(format!("[d{depth} l{lvl}] {}", msg.into()));
        }
    }

    pub fn constraint(&mut self, depth: usize, msg: impl Into<String>) {
        if self.log_constraints {
            self.log(depth, 1, format!("constraint {}", msg.into()));
        }
    }

    pub fn unify(&mut self, depth: usize, msg: impl Into<String>) {
        if self.log_unify {
            self.log(depth, 2, format!("unify {}", msg.into()));
        }
    }

    pub fn link(&mut self, depth: usize, msg: impl Into<String>) {
        if self.log_links {
            self.log(depth, 2, format!("link {}", msg.into()));
        }
    }

    pub fn into_shared(self) -> SharedDebug {
        Rc::new(RefCell::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_and_depth_gate_messages() {
        let mut d = DebugConfig { max_depth: 1, ..Default::default() };
        d.log(0, 1, "kept");
        d.log(0, 2, "too verbose");
        d.log(2, 1, "too deep");
        d.unify(0, "TRY a ~ b");
        assert_eq!(d.logs, vec!["[d0 l1] kept".to_string()]);
    }
}
