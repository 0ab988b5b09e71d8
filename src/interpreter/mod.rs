//! 行指向のコマンドインタプリタ
//!
//! 1行に1コマンド。空白区切りで、空白を含む引数は二重引用符で囲む。
//! `#` 以降はコメント。

mod parser;
mod runner;

pub use parser::{ParseError, Query, ScriptLine, parse_line, tokenize};
pub use runner::{Interpreter, RunSummary, ScriptError};
