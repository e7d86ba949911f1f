use std::sync::Arc;

use crate::error::ParseError;
use crate::item::Item;
use crate::request::Request;
use crate::response::Response;

/// One value produced by a parse callback.
#[derive(Debug)]
pub enum ParseResult {
    /// Schedule this follow-up request.
    Request(Request),
    /// Send this item through the item pipeline.
    Item(Item),
}

impl ParseResult {
    pub fn request(request: Request) -> Result<Self, ParseError> {
        Ok(Self::Request(request))
    }

    pub fn item(item: Item) -> Result<Self, ParseError> {
        Ok(Self::Item(item))
    }
}

impl From<Request> for ParseResult {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Item> for ParseResult {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

/// Lazy, single-use sequence of parse results. An `Err` element ends it.
pub type ParseResults = Box<dyn Iterator<Item = Result<ParseResult, ParseError>> + Send>;

/// Callback turning a response into its parse results.
pub type ParseCallback = Arc<dyn Fn(Response) -> ParseResults + Send + Sync>;
