//! Token-driven pagination.
//!
//! A sequence issues `command(input)`, hands the output to `on_page`,
//! and, while the output carries a continuation token, builds the next
//! input from it and repeats. Pages are strictly sequential: page `n + 1`
//! is not built before `on_page` for page `n` has returned.
//!
//! The whole sequence runs on one [`ExecutionContext`], either the one
//! supplied or one picked from the pool.

use std::future::Future;

use crate::error::{BoxError, CirrusError, PageStage};
use crate::pool::{ExecutionContext, WorkerPool};

/// What `on_page` wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFlow {
    Continue,
    Stop,
}

impl From<bool> for PageFlow {
    /// `true` means continue.
    fn from(keep_going: bool) -> Self {
        if keep_going {
            PageFlow::Continue
        } else {
            PageFlow::Stop
        }
    }
}

/// Run a pagination sequence on a worker picked from `pool`.
pub async fn paginate<I, O, Tok, E, C, CF, T, N, P, PF>(
    pool: &WorkerPool,
    input: I,
    command: C,
    token_of: T,
    next_input: N,
    on_page: P,
) -> Result<(), CirrusError>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    Tok: Send + 'static,
    E: Into<BoxError> + 'static,
    C: FnMut(I) -> CF + Send + 'static,
    CF: Future<Output = Result<O, E>> + Send + 'static,
    T: Fn(&O) -> Option<Tok> + Send + 'static,
    N: Fn(I, Tok) -> I + Send + 'static,
    P: FnMut(O, ExecutionContext) -> PF + Send + 'static,
    PF: Future<Output = Result<PageFlow, E>> + Send + 'static,
{
    let ctx = pool.next()?;
    paginate_on(ctx, input, command, token_of, next_input, on_page).await
}

/// Run a pagination sequence with every command and callback on `ctx`.
pub async fn paginate_on<I, O, Tok, E, C, CF, T, N, P, PF>(
    ctx: ExecutionContext,
    input: I,
    mut command: C,
    token_of: T,
    next_input: N,
    mut on_page: P,
) -> Result<(), CirrusError>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    Tok: Send + 'static,
    E: Into<BoxError> + 'static,
    C: FnMut(I) -> CF + Send + 'static,
    CF: Future<Output = Result<O, E>> + Send + 'static,
    T: Fn(&O) -> Option<Tok> + Send + 'static,
    N: Fn(I, Tok) -> I + Send + 'static,
    P: FnMut(O, ExecutionContext) -> PF + Send + 'static,
    PF: Future<Output = Result<PageFlow, E>> + Send + 'static,
{
    let page_ctx = ctx.clone();
    let sequence = async move {
        let mut input = input;
        let mut page = 0usize;
        loop {
            page += 1;
            tracing::trace!(page, worker = page_ctx.index(), "requesting page");

            let output = command(input.clone())
                .await
                .map_err(|e| failure(page, PageStage::Command, e))?;
            let token = token_of(&output);

            let flow = on_page(output, page_ctx.clone())
                .await
                .map_err(|e| failure(page, PageStage::OnPage, e))?;
            if flow == PageFlow::Stop {
                tracing::trace!(page, "pagination stopped by caller");
                return Ok(());
            }

            match token {
                Some(token) => input = next_input(input, token),
                None => {
                    tracing::trace!(pages = page, "pagination exhausted");
                    return Ok(());
                }
            }
        }
    };

    ctx.run(sequence).await?
}

fn failure<E: Into<BoxError>>(page: usize, stage: PageStage, error: E) -> CirrusError {
    let source = error.into();
    tracing::warn!(page, %stage, error = %source, "pagination failed");
    CirrusError::Pagination {
        page,
        stage,
        source,
    }
}
