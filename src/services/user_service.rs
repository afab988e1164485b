use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};

use crate::{
    audit,
    domain::national_id,
    dto::users::{CreateCourierRequest, CreateCustomerRequest, CreateUserRequest},
    entity::{
        Couriers, Customers, Installations, Pickups, Users, couriers, customers,
        enums::{CourierStatus, CustomerKind, Role},
        installations, pickups, users,
    },
    error::{AppError, AppResult},
    models::{Courier, Customer, User},
    response::Meta,
    routes::params::CustomerQuery,
    services::{Caller, auth_service},
    state::AppState,
};

/// Account fields shared by every way of creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            login: req.login,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            role: req.role,
            is_superuser: false,
        }
    }
}

impl NewUser {
    fn normalized(mut self) -> AppResult<Self> {
        self.login = self.login.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if self.login.is_empty() {
            return Err(AppError::validation("login", "must not be empty"));
        }
        if !is_plausible_email(&self.email) {
            return Err(AppError::validation("email", "must be a valid address"));
        }
        auth_service::validate_password(&self.password)?;
        Ok(self)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}

async fn ensure_unique_identity<C: ConnectionTrait>(conn: &C, login: &str, email: &str) -> AppResult<()> {
    if Users::find()
        .filter(users::Column::Login.eq(login))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("login", format!("login `{login}` is already taken")));
    }
    if Users::find()
        .filter(users::Column::Email.eq(email))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("email", format!("email `{email}` is already taken")));
    }
    Ok(())
}

async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    user: &NewUser,
    password_hash: String,
) -> AppResult<users::Model> {
    ensure_unique_identity(conn, &user.login, &user.email).await?;

    let model = users::ActiveModel {
        id: NotSet,
        login: Set(user.login.clone()),
        email: Set(user.email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        phone: Set(user.phone.clone()),
        role: Set(user.role),
        is_active: Set(true),
        is_superuser: Set(user.is_superuser),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(model)
}

async fn insert_customer_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    national_id: &str,
    kind: CustomerKind,
) -> AppResult<customers::Model> {
    if Customers::find()
        .filter(customers::Column::NationalId.eq(national_id))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            "national_id",
            format!("national id `{national_id}` is already registered"),
        ));
    }

    let profile = customers::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        national_id: Set(national_id.to_string()),
        kind: Set(kind),
    }
    .insert(conn)
    .await?;
    Ok(profile)
}

pub async fn create_user(state: &AppState, caller: Caller, new_user: NewUser) -> AppResult<User> {
    let new_user = new_user.normalized()?;
    let hash = auth_service::hash_password(new_user.password.clone()).await?;
    let user = insert_user(&state.orm, &new_user, hash).await?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "user created");
    audit::record(
        &state.pool,
        caller.user_id,
        "user_create",
        "users",
        serde_json::json!({ "user_id": user.id, "role": user.role.as_str() }),
    )
    .await;
    Ok(user.into())
}

pub async fn create_customer(
    state: &AppState,
    caller: Caller,
    req: CreateCustomerRequest,
) -> AppResult<Customer> {
    let national_id = national_id::normalize(&req.national_id)?;
    let new_user = NewUser {
        login: req.login,
        email: req.email,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        role: Role::Customer,
        is_superuser: false,
    }
    .normalized()?;
    let hash = auth_service::hash_password(new_user.password.clone()).await?;

    let txn = state.orm.begin().await?;
    let user = insert_user(&txn, &new_user, hash).await?;
    let profile = insert_customer_profile(&txn, user.id, &national_id, req.kind).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "customer_create",
        "customers",
        serde_json::json!({ "customer_id": profile.id, "user_id": user.id }),
    )
    .await;
    Ok(Customer::from_parts(profile, user))
}

/// Customer details collected by the public booking form.
#[derive(Debug, Clone)]
pub struct BookingCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: String,
    pub kind: CustomerKind,
}

/// Reuse the customer behind `national_id` (the email must match) or `email`, registering a new one otherwise.
///
/// Returns the profile, its user and whether it was created.
pub(crate) async fn find_or_register_customer<C: ConnectionTrait>(
    conn: &C,
    details: &BookingCustomer,
) -> AppResult<(customers::Model, users::Model, bool)> {
    let national_id = national_id::normalize(&details.national_id)?;
    let email = details.email.trim().to_lowercase();

    if let Some(profile) = Customers::find()
        .filter(customers::Column::NationalId.eq(national_id.as_str()))
        .one(conn)
        .await?
    {
        let user = Users::find_by_id(profile.user_id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        if user.email != email {
            return Err(AppError::conflict(
                "national_id",
                "national id is registered with a different email",
            ));
        }
        return Ok((profile, user, false));
    }

    if let Some(user) = Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(conn)
        .await?
    {
        if user.role != Role::Customer {
            return Err(AppError::conflict("email", "email belongs to a staff account"));
        }
        if Customers::find()
            .filter(customers::Column::UserId.eq(user.id))
            .one(conn)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "national_id",
                "email is registered with a different national id",
            ));
        }
        let profile = insert_customer_profile(conn, user.id, &national_id, details.kind).await?;
        return Ok((profile, user, true));
    }

    // Booking customers get an unusable random password until staff set one.
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    let new_user = NewUser {
        login: email.clone(),
        email,
        password,
        first_name: details.first_name.clone(),
        last_name: details.last_name.clone(),
        phone: details.phone.clone(),
        role: Role::Customer,
        is_superuser: false,
    }
    .normalized()?;
    let hash = auth_service::hash_password(new_user.password.clone()).await?;
    let user = insert_user(conn, &new_user, hash).await?;
    let profile = insert_customer_profile(conn, user.id, &national_id, details.kind).await?;
    Ok((profile, user, true))
}

pub async fn create_courier(
    state: &AppState,
    caller: Caller,
    req: CreateCourierRequest,
) -> AppResult<Courier> {
    let new_user = NewUser {
        login: req.login,
        email: req.email,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        role: Role::Courier,
        is_superuser: false,
    }
    .normalized()?;
    let hash = auth_service::hash_password(new_user.password.clone()).await?;

    let txn = state.orm.begin().await?;
    let user = insert_user(&txn, &new_user, hash).await?;
    let profile = couriers::ActiveModel {
        id: NotSet,
        user_id: Set(user.id),
        license_number: Set(req.license_number.filter(|v| !v.trim().is_empty())),
        vehicle: Set(req.vehicle.filter(|v| !v.trim().is_empty())),
        status: Set(CourierStatus::Available),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(courier_id = profile.id, user_id = user.id, "courier created");
    audit::record(
        &state.pool,
        caller.user_id,
        "courier_create",
        "couriers",
        serde_json::json!({ "courier_id": profile.id, "user_id": user.id }),
    )
    .await;
    Ok(Courier::from_parts(profile, user))
}

pub async fn get_user(state: &AppState, user_id: i32) -> AppResult<users::Model> {
    Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("user"))
}

pub async fn set_password(
    state: &AppState,
    caller: Caller,
    user_id: i32,
    password: &str,
) -> AppResult<()> {
    auth_service::validate_password(password)?;
    let user = get_user(state, user_id).await?;
    let hash = auth_service::hash_password(password.to_string()).await?;

    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(hash);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "password_set",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;
    Ok(())
}

pub async fn deactivate(state: &AppState, caller: Caller, user_id: i32) -> AppResult<User> {
    let user = get_user(state, user_id).await?;
    let mut active: users::ActiveModel = user.into();
    active.is_active = Set(false);
    let user = active.update(&state.orm).await?;

    tracing::info!(user_id, "user deactivated");
    audit::record(
        &state.pool,
        caller.user_id,
        "user_deactivate",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;
    Ok(user.into())
}

/// Set every courier's password in one transaction; any failure leaves all of them untouched.
pub async fn reset_courier_passwords(state: &AppState, new_password: &str) -> AppResult<usize> {
    auth_service::validate_password(new_password)?;

    // Hashed once and written to every courier row.
    let password_hash = auth_service::hash_password(new_password.to_string()).await?;

    let txn = state.orm.begin().await?;
    let result = Users::update_many()
        .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
        .filter(users::Column::Role.eq(Role::Courier))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    let updated = result.rows_affected as usize;

    audit::record(
        &state.pool,
        None,
        "courier_passwords_reset",
        "users",
        serde_json::json!({ "count": updated }),
    )
    .await;
    Ok(updated)
}

async fn courier_with_user(state: &AppState, courier_id: i32) -> AppResult<(couriers::Model, users::Model)> {
    let (profile, user) = Couriers::find_by_id(courier_id)
        .find_also_related(Users)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("courier"))?;
    let user = user.ok_or(AppError::NotFound("user"))?;
    Ok((profile, user))
}

pub async fn get_courier(state: &AppState, courier_id: i32) -> AppResult<Courier> {
    let (profile, user) = courier_with_user(state, courier_id).await?;
    Ok(Courier::from_parts(profile, user))
}

/// Courier profile of the logged-in user.
pub async fn courier_for_user(state: &AppState, user_id: i32) -> AppResult<couriers::Model> {
    Couriers::find()
        .filter(couriers::Column::UserId.eq(user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("courier"))
}

pub async fn set_courier_status(
    state: &AppState,
    caller: Caller,
    courier_id: i32,
    status: CourierStatus,
) -> AppResult<Courier> {
    let (profile, user) = courier_with_user(state, courier_id).await?;
    let mut active: couriers::ActiveModel = profile.into();
    active.status = Set(status);
    let profile = active.update(&state.orm).await?;

    tracing::info!(courier_id, status = status.as_str(), "courier status changed");
    audit::record(
        &state.pool,
        caller.user_id,
        "courier_status",
        "couriers",
        serde_json::json!({ "courier_id": courier_id, "status": status.as_str() }),
    )
    .await;
    Ok(Courier::from_parts(profile, user))
}

/// Detach the courier from its jobs, then drop the profile. Jobs survive unassigned.
pub async fn delete_courier(state: &AppState, caller: Caller, courier_id: i32) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let profile = Couriers::find_by_id(courier_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("courier"))?;

    let installations = Installations::update_many()
        .col_expr(installations::Column::CourierId, Expr::value(Option::<i32>::None))
        .filter(installations::Column::CourierId.eq(profile.id))
        .exec(&txn)
        .await?;
    let pickups = Pickups::update_many()
        .col_expr(pickups::Column::CourierId, Expr::value(Option::<i32>::None))
        .filter(pickups::Column::CourierId.eq(profile.id))
        .exec(&txn)
        .await?;
    Couriers::delete_by_id(profile.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        courier_id,
        installations = installations.rows_affected,
        pickups = pickups.rows_affected,
        "courier deleted"
    );
    audit::record(
        &state.pool,
        caller.user_id,
        "courier_delete",
        "couriers",
        serde_json::json!({ "courier_id": courier_id }),
    )
    .await;
    Ok(())
}

pub async fn list_couriers(state: &AppState) -> AppResult<Vec<Courier>> {
    let rows = Couriers::find()
        .find_also_related(Users)
        .order_by_asc(couriers::Column::Id)
        .all(&state.orm)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(profile, user)| user.map(|user| Courier::from_parts(profile, user)))
        .collect())
}

pub async fn get_customer(state: &AppState, customer_id: i32) -> AppResult<Customer> {
    let (profile, user) = Customers::find_by_id(customer_id)
        .find_also_related(Users)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("customer"))?;
    let user = user.ok_or(AppError::NotFound("user"))?;
    Ok(Customer::from_parts(profile, user))
}

/// Customers ordered by id; `q` matches name, email or national id.
pub async fn list_customers(state: &AppState, query: &CustomerQuery) -> AppResult<(Vec<Customer>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Customers::find().find_also_related(Users);
    if let Some(q) = query.q.as_ref().map(|q| q.trim()).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        finder = finder.filter(
            Condition::any()
                .add(Expr::col((users::Entity, users::Column::FirstName)).ilike(pattern.clone()))
                .add(Expr::col((users::Entity, users::Column::LastName)).ilike(pattern.clone()))
                .add(Expr::col((users::Entity, users::Column::Email)).ilike(pattern.clone()))
                .add(Expr::col((customers::Entity, customers::Column::NationalId)).ilike(pattern)),
        );
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .order_by_asc(customers::Column::Id)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(profile, user)| user.map(|user| Customer::from_parts(profile, user)))
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewUser {
        NewUser {
            login: "  ana ".into(),
            email: " Ana@Example.CL ".into(),
            password: "secret123".into(),
            first_name: "Ana".into(),
            last_name: "Rojas".into(),
            phone: Some("   ".into()),
            role: Role::Customer,
            is_superuser: false,
        }
    }

    #[test]
    fn normalizes_identity_fields() {
        let user = sample().normalized().unwrap();
        assert_eq!(user.login, "ana");
        assert_eq!(user.email, "ana@example.cl");
        assert_eq!(user.phone, None);
    }

    #[test]
    fn rejects_bad_email_and_short_password() {
        let mut bad_email = sample();
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            bad_email.normalized(),
            Err(AppError::Validation { field: "email", .. })
        ));

        let mut short = sample();
        short.password = "abc".into();
        assert!(matches!(
            short.normalized(),
            Err(AppError::Validation { field: "password", .. })
        ));
    }
}
