use crate::events::{CrawlEvent, EventBus};
use crate::item::Item;
use crate::parse::ParseResult;
use crate::pipeline::ItemPipeline;
use crate::response::Response;
use crate::scheduler::RequestScheduler;

/// Fans a response out into follow-up requests and items.
#[derive(Debug, Clone)]
pub struct Processor {
    events: EventBus,
}

impl Processor {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }

    /// Drain the originating request's parse callback in order.
    ///
    /// Requests go to `scheduler`, items through `pipeline`. The first `Err`
    /// stops draining and is reported as `ProcessingError`. Returns the items
    /// that made it through the pipeline.
    pub async fn process<S: RequestScheduler>(
        &self,
        response: Response,
        scheduler: &mut S,
        pipeline: &ItemPipeline,
    ) -> Vec<Item> {
        let request = response.request().clone();
        let parse = request.parser();
        let mut scraped = Vec::new();

        for result in parse(response) {
            match result {
                Ok(ParseResult::Request(next)) => {
                    self.events
                        .publish(CrawlEvent::RequestScheduling { request: &next });
                    scheduler.schedule(next);
                }
                Ok(ParseResult::Item(item)) => {
                    if let Some(item) = pipeline.process(item).await {
                        scraped.push(item);
                    }
                }
                Err(error) => {
                    self.events.publish(CrawlEvent::ProcessingError {
                        request: &request,
                        error: &error,
                    });
                    break;
                }
            }
        }
        scraped
    }
}
