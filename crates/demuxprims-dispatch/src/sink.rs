use crate::outcome::ParseOutcome;

/// Receiver of parse outcomes.
///
/// Outcomes for a single source arrive in the order that source's bytes were
/// parsed.
pub trait OutcomeSink<I> {
    fn deliver(&mut self, outcome: ParseOutcome<I>);
}

impl<I> OutcomeSink<I> for Vec<ParseOutcome<I>> {
    fn deliver(&mut self, outcome: ParseOutcome<I>) {
        self.push(outcome);
    }
}

impl<I> OutcomeSink<I> for std::sync::mpsc::Sender<ParseOutcome<I>> {
    fn deliver(&mut self, outcome: ParseOutcome<I>) {
        if self.send(outcome).is_err() {
            tracing::debug!("outcome receiver dropped");
        }
    }
}

#[cfg(feature = "async")]
impl<I> OutcomeSink<I> for tokio::sync::mpsc::UnboundedSender<ParseOutcome<I>> {
    fn deliver(&mut self, outcome: ParseOutcome<I>) {
        if self.send(outcome).is_err() {
            tracing::debug!("outcome receiver dropped");
        }
    }
}

/// Sink that forwards each outcome to a closure.
pub struct FnSink<F>(pub F);

impl<I, F> OutcomeSink<I> for FnSink<F>
where
    F: FnMut(ParseOutcome<I>),
{
    fn deliver(&mut self, outcome: ParseOutcome<I>) {
        (self.0)(outcome)
    }
}

/// Sink that drops every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<I> OutcomeSink<I> for NullSink {
    fn deliver(&mut self, _outcome: ParseOutcome<I>) {}
}
