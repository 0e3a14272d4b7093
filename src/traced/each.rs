//! Parameterized registration.
//!
//! Rows are any [`Serialize`] value. They are turned into JSON once, only to
//! build the titles; the callbacks get the original row back by value, so a
//! tuple row can be destructured right in the closure's parameter list.
//!
//! All rows are converted before the first registration. A row that fails
//! to serialize leaves the host untouched.

use std::{future::Future, sync::Arc};

use serde::Serialize;

use super::{TracedDescribe, TracedTest};
use crate::{
    Error,
    format::format_title,
    host::TestHost,
    test::{TestFnHandle, TestResult},
};

fn titles<R: Serialize>(template: &str, rows: &[R]) -> Result<Vec<String>, Error> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let row = serde_json::to_value(row).map_err(|source| Error::EachRow { index, source })?;
            Ok(format_title(template, &row, index))
        })
        .collect()
}

/// `test.each(rows)`, waiting for its title template and callback.
#[must_use = "no test is registered until `call` is invoked"]
pub struct EachTest<'r, H, R> {
    registrar: &'r TracedTest<H>,
    rows: Vec<R>,
}

impl<'r, H, R> EachTest<'r, H, R> {
    pub(super) fn new(registrar: &'r TracedTest<H>, rows: Vec<R>) -> Self {
        Self { registrar, rows }
    }
}

impl<H, R> EachTest<'_, H, R>
where
    H: TestHost,
    R: Serialize + Clone + Send + Sync + 'static,
{
    /// Register one test per row, titled by expanding `template` against it.
    pub fn call<F, Fut>(self, template: &str, f: F) -> Result<(), Error>
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Into<TestResult>,
    {
        self.register(template, f, H::Options::default)
    }

    /// Like [`EachTest::call`], handing every test a copy of `options`.
    pub fn call_with<F, Fut>(self, template: &str, f: F, options: H::Options) -> Result<(), Error>
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Into<TestResult>,
        H::Options: Clone,
    {
        self.register(template, f, || options.clone())
    }

    fn register<F, Fut>(
        self,
        template: &str,
        f: F,
        mut options: impl FnMut() -> H::Options,
    ) -> Result<(), Error>
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Into<TestResult>,
    {
        let titles = titles(template, &self.rows)?;
        let f = Arc::new(f);
        for (row, title) in self.rows.into_iter().zip(titles) {
            let f = Arc::clone(&f);
            let handle = TestFnHandle::new(move || f(row.clone()));
            self.registrar.register(title.into(), handle, options());
        }
        Ok(())
    }
}

/// `describe.each(rows)`, waiting for its title template and body.
#[must_use = "no group is registered until `call` is invoked"]
pub struct EachDescribe<'r, H, R> {
    registrar: &'r TracedDescribe<H>,
    rows: Vec<R>,
}

impl<'r, H, R> EachDescribe<'r, H, R> {
    pub(super) fn new(registrar: &'r TracedDescribe<H>, rows: Vec<R>) -> Self {
        Self { registrar, rows }
    }
}

impl<H, R> EachDescribe<'_, H, R>
where
    H: TestHost,
    R: Serialize,
{
    /// Register one group per row. `body` is called once per row, inside
    /// that row's group.
    pub fn call(self, template: &str, mut body: impl FnMut(R)) -> Result<(), Error> {
        let titles = titles(template, &self.rows)?;
        for (row, title) in self.rows.into_iter().zip(titles) {
            self.registrar.call(title, || body(row));
        }
        Ok(())
    }
}
