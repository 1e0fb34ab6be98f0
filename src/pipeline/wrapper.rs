//! Pre-condition stages run in front of a service operation.
//!
//! Stages are registered explicitly by each operation and execute in the
//! order they were added. The first failing stage short-circuits; the
//! wrapped operation only runs once every stage has passed.

use std::future::Future;

use super::extract::ParentIds;
use crate::auth::Token;
use crate::error::AppError;

/// Arguments shared by every service operation: the caller's token, the
/// parent ids of a nested route and the verb-specific arguments.
#[derive(Debug, Clone)]
pub struct Call<A> {
    pub token: Token,
    pub parent_ids: Option<ParentIds>,
    pub args: A,
}

impl<A> Call<A> {
    pub fn new(token: Token, parent_ids: Option<ParentIds>, args: A) -> Self {
        Self {
            token,
            parent_ids,
            args,
        }
    }
}

type Stage<'a, A> = Box<dyn FnOnce(&mut Call<A>) -> Result<(), AppError> + 'a>;

pub struct Guarded<'a, A> {
    call: Call<A>,
    stages: Vec<Stage<'a, A>>,
}

impl<'a, A> Guarded<'a, A> {
    pub fn new(call: Call<A>) -> Self {
        Self {
            call,
            stages: Vec::new(),
        }
    }

    /// Adds a stage that fills in defaults. Register it before `validate`
    /// when the defaults are fields the schema requires.
    pub fn prepare<F>(mut self, prepare: F) -> Self
    where
        F: FnOnce(&mut Call<A>) + 'a,
    {
        self.stages.push(Box::new(move |call| {
            prepare(call);
            Ok(())
        }));
        self
    }

    /// Adds a read-only check.
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: FnOnce(&Call<A>) -> Result<(), AppError> + 'a,
    {
        self.stages.push(Box::new(move |call| validate(call)));
        self
    }

    /// Runs the stages and hands back the checked call.
    pub fn check(self) -> Result<Call<A>, AppError> {
        let Guarded { mut call, stages } = self;
        for stage in stages {
            stage(&mut call)?;
        }
        Ok(call)
    }

    pub async fn run<T, F, Fut>(self, operation: F) -> Result<T, AppError>
    where
        F: FnOnce(Call<A>) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let call = self.check()?;
        operation(call).await
    }
}
