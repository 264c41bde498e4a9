use std::marker::PhantomData;
use std::str::FromStr;

use super::{Load, Loader};
use crate::document::Document;
use crate::errors::ValidationErrors;
use crate::gates::GateContext;

// ------------------------------- Strings ---------------------------------- //

pub struct StringLoader;

impl Loader<String> for StringLoader {
    fn load_into(&self, doc: &Document, _: &dyn GateContext, dst: &mut String, errors: &mut ValidationErrors) {
        match doc {
            Document::String(s) => dst.clone_from(s),
            _ => errors.add_error("is not a string"),
        }
    }
}

impl Load for String {
    const LOADER: &'static dyn Loader<Self> = &StringLoader;
}

// -------------------------------- Bools ----------------------------------- //

pub struct BoolLoader;

impl Loader<bool> for BoolLoader {
    fn load_into(&self, doc: &Document, _: &dyn GateContext, dst: &mut bool, errors: &mut ValidationErrors) {
        match doc {
            Document::Bool(b) => *dst = *b,
            _ => errors.add_error("is not a boolean"),
        }
    }
}

impl Load for bool {
    const LOADER: &'static dyn Loader<Self> = &BoolLoader;
}

// ------------------------------- Numbers ---------------------------------- //

/// Numeric types readable from number text.
pub trait NumberText: FromStr + 'static {
    const PARSE_ERROR: &'static str;
}

impl NumberText for i32 { const PARSE_ERROR: &'static str = "failed to parse number"; }
impl NumberText for i64 { const PARSE_ERROR: &'static str = "failed to parse number"; }
impl NumberText for u32 { const PARSE_ERROR: &'static str = "failed to parse non-negative number"; }
impl NumberText for u64 { const PARSE_ERROR: &'static str = "failed to parse non-negative number"; }
impl NumberText for f32 { const PARSE_ERROR: &'static str = "failed to parse floating-point number"; }
impl NumberText for f64 { const PARSE_ERROR: &'static str = "failed to parse floating-point number"; }

/// Accepts a JSON number or a JSON string holding one.
pub struct NumberLoader<N>(PhantomData<fn() -> N>);

impl<N> NumberLoader<N> {
    pub const NEW: Self = NumberLoader(PhantomData);
}

impl<N: NumberText> Loader<N> for NumberLoader<N> {
    fn load_into(&self, doc: &Document, _: &dyn GateContext, dst: &mut N, errors: &mut ValidationErrors) {
        let text = match doc {
            Document::Number(text) | Document::String(text) => text,
            _ => {
                errors.add_error("is not a number");
                return;
            }
        };
        match text.trim_ascii().parse::<N>() {
            Ok(v) => *dst = v,
            Err(_) => errors.add_error(N::PARSE_ERROR),
        }
    }
}

impl Load for i32 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<i32>::NEW; }
impl Load for i64 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<i64>::NEW; }
impl Load for u32 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<u32>::NEW; }
impl Load for u64 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<u64>::NEW; }
impl Load for f32 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<f32>::NEW; }
impl Load for f64 { const LOADER: &'static dyn Loader<Self> = &NumberLoader::<f64>::NEW; }

// ---------------------------- Raw documents ------------------------------- //

/// Copies the value through untouched.
pub struct DocumentLoader;

impl Loader<Document> for DocumentLoader {
    fn load_into(&self, doc: &Document, _: &dyn GateContext, dst: &mut Document, _: &mut ValidationErrors) {
        dst.clone_from(doc);
    }
}

impl Load for Document {
    const LOADER: &'static dyn Loader<Self> = &DocumentLoader;
}

// ------------------------------- Tests ------------------------------------ //
