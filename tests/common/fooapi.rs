//! `Foo.Test` service as the schema compiler would emit it
//!
//! Kept by hand so the workspace tests exercise the same surface generated
//! code uses: one `MethodInfo` static per method, typed params and results,
//! `Validate` bodies built from the `check_*` helpers, a registration function
//! for servers and a typed client wrapper.

use std::future::Future;
use std::ops::Bound;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use trellis::client::{Client, ClientOptions};
use trellis::common::model::Model;
use trellis::common::protocol::{BoxError, MethodInfo, Result, RpcError};
use trellis::common::validation::{
    check_count, check_float_range, check_int_range, check_length, check_one_of, check_pattern, validate_each,
    validate_field, FurtherValidate, Pattern, Validate, ValidationContext,
};
use trellis::server::{HandlerResult, Router, ServerOptions, ServiceRegistrar};

pub static TEST_DO_SOMETHING: MethodInfo = MethodInfo::new("Foo", "Test", "DoSomething", "Foo.Test.DoSomething", 0);
pub static TEST_DO_SOMETHING2: MethodInfo =
    MethodInfo::new("Foo", "Test", "DoSomething2", "Foo.Test.DoSomething2", 1);
pub static TEST_DO_SOMETHING3: MethodInfo =
    MethodInfo::new("Foo", "Test", "DoSomething3", "Foo.Test.DoSomething3", 2);

pub const TEST_METHOD_COUNT: usize = 3;

pub const ENUM_INT32_VALUES: [i32; 2] = [100, 200];
pub const ENUM_STRING_VALUES: [&str; 2] = ["abc", "def"];

static X_STRING_PATTERN: Pattern = Pattern::new("[a-zA-Z0-9]*");

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XString(pub String);

impl Validate for XString {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        if !check_length(vc, &self.0, 3, Some(9)) {
            return false;
        }
        if !check_pattern(vc, &self.0, &X_STRING_PATTERN) {
            return false;
        }
        self.further_validate(vc)
    }
}

impl FurtherValidate for XString {
    fn further_validate(&self, vc: &mut ValidationContext) -> bool {
        if self.0 == "taboo" {
            vc.set_error_details("this is taboo!");
            return false;
        }
        true
    }
}

impl From<&str> for XString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MyStructInt32 {
    pub the_int32_a: i32,
    pub the_x_int32_a: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub the_optional_x_int32_a: Option<i32>,
    pub the_repeated_x_int32_a: Vec<i32>,
    pub the_count_limited_repeated_x_int32_a: Vec<i32>,
    pub the_enum_int32: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub the_optional_enum_int32: Option<i32>,
    pub the_repeated_enum_int32: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<Box<MyStructInt32>>,
    pub others: Vec<MyStructInt32>,
    pub count_limited_others: Vec<MyStructInt32>,
}

fn check_x_int32(vc: &mut ValidationContext, value: i32) -> bool {
    check_int_range(vc, value, Some(100), Some(999))
}

impl Validate for MyStructInt32 {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        if !validate_field(vc, "theXInt32A", |vc| check_x_int32(vc, self.the_x_int32_a)) {
            return false;
        }
        if let Some(value) = self.the_optional_x_int32_a {
            if !validate_field(vc, "theOptionalXInt32A", |vc| check_x_int32(vc, value)) {
                return false;
            }
        }
        if !validate_field(vc, "theRepeatedXInt32A", |vc| {
            validate_each(vc, &self.the_repeated_x_int32_a, |vc, value| check_x_int32(vc, *value))
        }) {
            return false;
        }
        if !validate_field(vc, "theCountLimitedRepeatedXInt32A", |vc| {
            check_count(vc, &self.the_count_limited_repeated_x_int32_a, 3, Some(5))
                && validate_each(vc, &self.the_count_limited_repeated_x_int32_a, |vc, value| {
                    check_x_int32(vc, *value)
                })
        }) {
            return false;
        }
        if !validate_field(vc, "theEnumInt32", |vc| {
            check_one_of(vc, &self.the_enum_int32, &ENUM_INT32_VALUES)
        }) {
            return false;
        }
        if let Some(value) = self.the_optional_enum_int32 {
            if !validate_field(vc, "theOptionalEnumInt32", |vc| check_one_of(vc, &value, &ENUM_INT32_VALUES)) {
                return false;
            }
        }
        if !validate_field(vc, "theRepeatedEnumInt32", |vc| {
            validate_each(vc, &self.the_repeated_enum_int32, |vc, value| {
                check_one_of(vc, value, &ENUM_INT32_VALUES)
            })
        }) {
            return false;
        }
        if !validate_field(vc, "other", |vc| self.other.validate(vc)) {
            return false;
        }
        if !validate_field(vc, "others", |vc| validate_each(vc, &self.others, |vc, other| other.validate(vc))) {
            return false;
        }
        if !validate_field(vc, "countLimitedOthers", |vc| {
            check_count(vc, &self.count_limited_others, 0, Some(3))
                && validate_each(vc, &self.count_limited_others, |vc, other| other.validate(vc))
        }) {
            return false;
        }
        self.further_validate(vc)
    }
}

impl FurtherValidate for MyStructInt32 {
    fn further_validate(&self, vc: &mut ValidationContext) -> bool {
        if self.the_int32_a == 666666 {
            vc.set_error_details("theInt32A is evil!");
            return false;
        }
        true
    }
}

impl Model for MyStructInt32 {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MyStructFloat64 {
    pub the_float64_a: f64,
    pub the_x_closed_float64_a: f64,
    pub the_repeated_x_closed_float64_a: Vec<f64>,
    pub the_x_open_float64_a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub the_optional_x_open_float64_a: Option<f64>,
    pub the_count_limited_repeated_x_open_float64_a: Vec<f64>,
}

fn check_x_closed_float64(vc: &mut ValidationContext, value: f64) -> bool {
    check_float_range(vc, value, Bound::Included(-100.0), Bound::Included(100.0))
}

fn check_x_open_float64(vc: &mut ValidationContext, value: f64) -> bool {
    check_float_range(vc, value, Bound::Excluded(-10.0), Bound::Excluded(-1.5))
}

impl Validate for MyStructFloat64 {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        if !validate_field(vc, "theXClosedFloat64A", |vc| check_x_closed_float64(vc, self.the_x_closed_float64_a)) {
            return false;
        }
        if !validate_field(vc, "theRepeatedXClosedFloat64A", |vc| {
            validate_each(vc, &self.the_repeated_x_closed_float64_a, |vc, value| {
                check_x_closed_float64(vc, *value)
            })
        }) {
            return false;
        }
        if !validate_field(vc, "theXOpenFloat64A", |vc| check_x_open_float64(vc, self.the_x_open_float64_a)) {
            return false;
        }
        if let Some(value) = self.the_optional_x_open_float64_a {
            if !validate_field(vc, "theOptionalXOpenFloat64A", |vc| check_x_open_float64(vc, value)) {
                return false;
            }
        }
        validate_field(vc, "theCountLimitedRepeatedXOpenFloat64A", |vc| {
            check_count(vc, &self.the_count_limited_repeated_x_open_float64_a, 3, Some(5))
                && validate_each(vc, &self.the_count_limited_repeated_x_open_float64_a, |vc, value| {
                    check_x_open_float64(vc, *value)
                })
        })
    }
}

impl Model for MyStructFloat64 {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MyStructString {
    pub the_string_a: String,
    pub the_x_string_b: XString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub the_optional_x_string_b: Option<XString>,
    pub the_repeated_x_string_b: Vec<XString>,
    pub the_enum_string: String,
    pub the_count_limited_repeated_enum_string: Vec<String>,
    pub others: Vec<MyStructString>,
}

impl Validate for MyStructString {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        if !validate_field(vc, "theXStringB", |vc| self.the_x_string_b.validate(vc)) {
            return false;
        }
        if !validate_field(vc, "theOptionalXStringB", |vc| self.the_optional_x_string_b.validate(vc)) {
            return false;
        }
        if !validate_field(vc, "theRepeatedXStringB", |vc| {
            validate_each(vc, &self.the_repeated_x_string_b, |vc, value| value.validate(vc))
        }) {
            return false;
        }
        if !validate_field(vc, "theEnumString", |vc| {
            check_one_of(vc, &self.the_enum_string.as_str(), &ENUM_STRING_VALUES)
        }) {
            return false;
        }
        if !validate_field(vc, "theCountLimitedRepeatedEnumString", |vc| {
            check_count(vc, &self.the_count_limited_repeated_enum_string, 3, Some(5))
                && validate_each(vc, &self.the_count_limited_repeated_enum_string, |vc, value| {
                    check_one_of(vc, &value.as_str(), &ENUM_STRING_VALUES)
                })
        }) {
            return false;
        }
        validate_field(vc, "others", |vc| validate_each(vc, &self.others, |vc, other| other.validate(vc)))
    }
}

impl Model for MyStructString {}

// ============================================================================
// Params and Results
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestDoSomethingParams {
    pub the_field: i32,
}

impl Validate for TestDoSomethingParams {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        validate_field(vc, "theField", |vc| check_int_range(vc, self.the_field, Some(100), Some(999)))
    }
}

impl Model for TestDoSomethingParams {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestDoSomething2Params {
    pub my_struct: MyStructString,
}

impl Validate for TestDoSomething2Params {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        validate_field(vc, "myStruct", |vc| self.my_struct.validate(vc))
    }
}

impl Model for TestDoSomething2Params {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestDoSomething2Results {
    pub my_struct: MyStructString,
}

impl Validate for TestDoSomething2Results {
    fn validate(&self, vc: &mut ValidationContext) -> bool {
        validate_field(vc, "myStruct", |vc| self.my_struct.validate(vc))
    }
}

impl Model for TestDoSomething2Results {}

// ============================================================================
// Server
// ============================================================================

/// Type-erased handler for one method.
pub type TestFunc<P, R> = Arc<dyn Fn(P) -> BoxFuture<'static, HandlerResult<R>> + Send + Sync>;

/// Wraps an async closure as a [`TestFunc`].
pub fn test_func<P, R, F, Fut>(f: F) -> TestFunc<P, R>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
{
    Arc::new(move |params| f(params).boxed())
}

/// Method implementations. Methods left as `None` answer "not implemented".
#[derive(Clone, Default)]
pub struct TestServerFuncs {
    pub do_something: Option<TestFunc<TestDoSomethingParams, ()>>,
    pub do_something2: Option<TestFunc<TestDoSomething2Params, TestDoSomething2Results>>,
    pub do_something3: Option<TestFunc<(), ()>>,
}

fn or_not_implemented<P, R>(func: Option<TestFunc<P, R>>) -> TestFunc<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    func.unwrap_or_else(|| test_func(|_params: P| async { Err::<R, BoxError>(Box::new(RpcError::not_implemented())) }))
}

/// Registers every `Foo.Test` method on `router`.
pub fn register_test_service(router: &mut Router, funcs: TestServerFuncs, options: &ServerOptions) -> Result<()> {
    let mut registrar = ServiceRegistrar::new(router, TEST_METHOD_COUNT, options);

    let do_something = or_not_implemented(funcs.do_something);
    registrar.register::<TestDoSomethingParams, (), _, _>(&TEST_DO_SOMETHING, move |params| do_something(params))?;

    let do_something2 = or_not_implemented(funcs.do_something2);
    registrar.register::<TestDoSomething2Params, TestDoSomething2Results, _, _>(&TEST_DO_SOMETHING2, move |params| {
        do_something2(params)
    })?;

    let do_something3 = or_not_implemented(funcs.do_something3);
    registrar.register::<(), (), _, _>(&TEST_DO_SOMETHING3, move |params| do_something3(params))?;
    Ok(())
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug)]
pub struct TestClient {
    client: Client,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            client: Client::new(base_url, TEST_METHOD_COUNT, options),
        }
    }

    pub async fn do_something(&self, params: TestDoSomethingParams) -> Result<()> {
        self.client.call(&TEST_DO_SOMETHING, params).await
    }

    pub async fn do_something2(&self, params: TestDoSomething2Params) -> Result<TestDoSomething2Results> {
        self.client.call(&TEST_DO_SOMETHING2, params).await
    }

    pub async fn do_something3(&self) -> Result<()> {
        self.client.call(&TEST_DO_SOMETHING3, ()).await
    }
}
