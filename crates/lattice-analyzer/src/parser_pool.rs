//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not Send + Sync, so parsing goes through
//! dedicated worker threads fed over a channel. The pool is shared by the
//! in-process front-ends (Python, and PHP when the grammar is compiled in);
//! the JS/TS front-end talks to its own out-of-process helper instead.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use tree_sitter::{Language, Parser, Tree};

/// Grammars the pool can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Python,
    #[cfg(feature = "php-ast")]
    Php,
}

impl Grammar {
    fn language(&self) -> Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            #[cfg(feature = "php-ast")]
            Grammar::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }
}

struct WorkerRequest {
    grammar: Grammar,
    content: String,
    response: Sender<Result<Tree>>,
}

/// Worker-thread parser pool. Clone-able; dropping every clone shuts the
/// workers down.
#[derive(Clone)]
pub struct ParserPool {
    sender: Arc<Mutex<Sender<WorkerRequest>>>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || Self::worker_thread(worker_id, receiver));
        }

        Self {
            sender: Arc::new(Mutex::new(sender)),
        }
    }

    /// Sized to the machine, at least two workers.
    pub fn with_default_size() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().max(2))
            .unwrap_or(2);
        Self::new(workers)
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!(worker_id, "parser worker started");
        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => break,
            };
            let WorkerRequest {
                grammar,
                content,
                response,
            } = match request {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!(worker_id, "parser worker shutting down");
                    break;
                }
            };

            if let Err(e) = parser.set_language(&grammar.language()) {
                let _ = response.send(Err(anyhow!("failed to set language: {e}")));
                continue;
            }

            let result = parser
                .parse(&content, None)
                .ok_or_else(|| anyhow!("parser produced no tree"));
            let _ = response.send(result);
        }
    }

    /// Parse synchronously on a worker thread; blocks until done.
    pub fn parse_blocking(&self, grammar: Grammar, content: &str) -> Result<Tree> {
        let (response, receiver) = channel();
        let request = WorkerRequest {
            grammar,
            content: content.to_string(),
            response,
        };
        self.sender
            .lock()
            .map_err(|_| anyhow!("parser pool lock poisoned"))?
            .send(request)
            .map_err(|_| anyhow!("parser pool is shut down"))?;
        receiver.recv().map_err(|_| anyhow!("parser worker died"))?
    }
}

/// Line of the first syntax error in a parsed tree, if any. Used to reject
/// files that did not parse cleanly: the model simply lacks entries for
/// them and one ParseFailure diagnostic is emitted.
pub fn first_error_line(root: &tree_sitter::Node) -> Option<u32> {
    fn visit(node: tree_sitter::Node) -> Option<u32> {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row as u32 + 1);
        }
        if !node.has_error() {
            return None;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(line) = visit(child) {
                return Some(line);
            }
        }
        None
    }
    if !root.has_error() {
        return None;
    }
    visit(*root).or(Some(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python() {
        let pool = ParserPool::new(2);
        let tree = pool
            .parse_blocking(Grammar::Python, "def main():\n    pass\n")
            .unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[cfg(feature = "php-ast")]
    #[test]
    fn parses_php() {
        let pool = ParserPool::new(1);
        let tree = pool
            .parse_blocking(Grammar::Php, "<?php\nclass Car {}\n")
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }
}
