mod attendance;
mod employees;
mod payroll;

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, MaybeUndefined, MergedObject, Object, Schema,
    SimpleObject,
};
use chrono::{DateTime, FixedOffset};
use entity::settings;
use platform_api::ApiError;
use products_hr::{AlertSink, DbSettings, HrError, HrModule, SalaryPeriod};
use serde::Serialize;
use tracing::instrument;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Everything resolvers read from the schema context.
#[derive(Clone)]
pub struct GraphqlData {
    pub hr: HrModule,
    pub settings: DbSettings,
    pub alerts: Arc<dyn AlertSink>,
}

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(data.hr)
        .data(data.settings)
        .data(data.alerts)
        .finish()
}

#[derive(MergedObject, Default)]
pub struct QueryRoot(
    SystemQuery,
    employees::EmployeeQuery,
    attendance::AttendanceQuery,
    payroll::PayrollQuery,
);

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    SettingsMutation,
    employees::EmployeeMutation,
    attendance::AttendanceMutation,
    payroll::PayrollMutation,
);

#[derive(Default)]
pub struct SystemQuery;

#[Object]
impl SystemQuery {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[instrument(name = "graphql.settings", skip_all)]
    async fn settings(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<SettingNode>> {
        let rows = ctx
            .data::<DbSettings>()?
            .list_settings()
            .await
            .map_err(hr_error)?;
        Ok(rows.into_iter().map(SettingNode::from).collect())
    }
}

#[derive(Default)]
pub struct SettingsMutation;

#[Object]
impl SettingsMutation {
    #[graphql(name = "putSetting")]
    #[instrument(name = "graphql.settings.put", skip(self, ctx, value, description))]
    async fn put_setting(
        &self,
        ctx: &Context<'_>,
        key: String,
        value: String,
        description: Option<String>,
    ) -> async_graphql::Result<SettingNode> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("key is required".into()).extend());
        }
        let row = ctx
            .data::<DbSettings>()?
            .put_setting(key, value.trim(), description)
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct SettingNode {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<settings::Model> for SettingNode {
    fn from(model: settings::Model) -> Self {
        Self {
            key: model.key,
            value: model.value,
            description: model.description,
            updated_at: model.updated_at,
        }
    }
}

fn hr<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a HrModule> {
    ctx.data::<HrModule>()
}

/// Maps core errors onto API codes; database failures are masked.
fn hr_error(err: HrError) -> async_graphql::Error {
    let api = match err {
        HrError::EmployeeNotFound(_)
        | HrError::AttendanceNotFound(_)
        | HrError::SalaryNotFound(_)
        | HrError::UnknownQrCode(_) => ApiError::NotFound(err.to_string()),
        HrError::AlreadyCheckedIn
        | HrError::NotCheckedIn
        | HrError::AlreadyCheckedOut
        | HrError::AttendanceComplete
        | HrError::DuplicateEmail(_)
        | HrError::DuplicateQrCode(_)
        | HrError::DuplicateAttendance { .. } => ApiError::Conflict(err.to_string()),
        HrError::InvalidPeriod { .. }
        | HrError::InvalidEmployee { .. }
        | HrError::InvalidQrToken
        | HrError::InvalidInput(_) => ApiError::InvalidInput(err.to_string()),
        HrError::Db(db) => ApiError::internal(db.into()),
    };
    api.extend()
}

/// Omitted keeps the stored value; `null` clears it.
fn patch_value<T>(value: MaybeUndefined<T>) -> Option<Option<T>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(value) => Some(Some(value)),
    }
}

fn period(month: i32, year: i32) -> async_graphql::Result<SalaryPeriod> {
    let month = u32::try_from(month).unwrap_or(0);
    SalaryPeriod::new(month, year).map_err(hr_error)
}

#[cfg(test)]
pub(crate) async fn test_schema(db: sea_orm::DatabaseConnection) -> SchemaType {
    use migration::{Migrator, MigratorTrait};
    use products_hr::{OrgClock, TracingSink, clock::DEFAULT_TIMEZONE};

    Migrator::up(&db, None).await.unwrap();
    let clock = OrgClock::system(DEFAULT_TIMEZONE);
    build_schema(GraphqlData {
        hr: HrModule::with_db_settings(db.clone(), clock),
        settings: DbSettings::new(db),
        alerts: Arc::new(TracingSink::new(DEFAULT_TIMEZONE)),
    })
}
