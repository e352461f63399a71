//! JavaScript structured form.
//!
//! The source text is validated with oxc on parse and kept as is; printing
//! re-runs oxc to produce either minified or re-indented output.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::ParseFailure;

/// Validated JavaScript source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsSource {
    code: String,
}

impl JsSource {
    /// Validate `source`. Errors report oxc's first diagnostic message.
    pub fn parse(source: &str) -> Result<Self, ParseFailure> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type()).parse();
        if let Some(err) = ret.errors.first() {
            return Err(ParseFailure::new(err.to_string()));
        }
        Ok(Self {
            code: source.to_owned(),
        })
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Print the program: re-indented when `pretty`, minified otherwise.
    ///
    /// Falls back to the stored source if it no longer parses.
    pub fn print(&self, pretty: bool) -> String {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, &self.code, source_type()).parse();
        if !ret.errors.is_empty() {
            return self.code.clone();
        }
        let mut program = ret.program;

        if pretty {
            return Codegen::new().build(&program).code;
        }

        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        let ret = Minifier::new(options).minify(&allocator, &mut program);
        Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code
    }
}

fn source_type() -> SourceType {
    SourceType::mjs()
}
