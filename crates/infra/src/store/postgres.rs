//! Postgres-backed record store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Rejected` |
//! | Database (check constraint violation) | `23514` | `Rejected` |
//! | Database (other) | Any other | `Rejected` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! Compound writes (`insert_role_with_permissions`, `delete_role_cascade`)
//! run in one transaction. `upsert_capability` is a single
//! `INSERT .. ON CONFLICT (role_id, module) DO UPDATE` touching one column,
//! so concurrent first toggles on different capabilities merge into one row.
//! Its foreign key violation (`23503`) is reported as a missing role.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use bizdesk_auth::{Capability, CapabilitySet, Module, Permission, Role};
use bizdesk_business::{Business, ContactInfo, EmployeeProfile, EmployeeStatus};
use bizdesk_core::{BranchId, BusinessId, EmployeeId, IdentityId, PermissionId, RoleId};

use super::{DeletedRole, Page, RecordStore, StoreError};

/// Schema statements applied by [`PostgresRecordStore::migrate`]. Idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS businesses (
        id          UUID PRIMARY KEY,
        owner_id    UUID NOT NULL,
        name        TEXT NOT NULL CHECK (btrim(name) <> ''),
        email       TEXT,
        phone       TEXT,
        address     TEXT,
        logo_url    TEXT,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS businesses_owner_idx ON businesses (owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id          UUID PRIMARY KEY,
        business_id UUID NOT NULL REFERENCES businesses (id),
        name        TEXT NOT NULL CHECK (btrim(name) <> ''),
        description TEXT,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS roles_business_name_key ON roles (business_id, lower(name))",
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id                UUID PRIMARY KEY,
        role_id           UUID NOT NULL REFERENCES roles (id),
        module            TEXT NOT NULL,
        create_permission BOOLEAN NOT NULL DEFAULT FALSE,
        read_permission   BOOLEAN NOT NULL DEFAULT FALSE,
        update_permission BOOLEAN NOT NULL DEFAULT FALSE,
        delete_permission BOOLEAN NOT NULL DEFAULT FALSE,
        created_at        TIMESTAMPTZ NOT NULL,
        updated_at        TIMESTAMPTZ NOT NULL,
        UNIQUE (role_id, module)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id          UUID PRIMARY KEY,
        business_id UUID NOT NULL REFERENCES businesses (id),
        branch_id   UUID,
        identity_id UUID,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        phone       TEXT,
        address     TEXT,
        hire_date   DATE,
        status      TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS employees_identity_key ON employees (identity_id) WHERE identity_id IS NOT NULL",
    r#"
    CREATE TABLE IF NOT EXISTS employee_roles (
        employee_id UUID NOT NULL REFERENCES employees (id),
        role_id     UUID NOT NULL REFERENCES roles (id),
        PRIMARY KEY (employee_id, role_id)
    )
    "#,
];

const PERMISSION_COLUMNS: &str = "id, role_id, module, create_permission, read_permission, \
     update_permission, delete_permission, created_at, updated_at";

const EMPLOYEE_COLUMNS: &str = "id, business_id, branch_id, identity_id, name, email, phone, \
     address, hire_date, status, created_at, updated_at";

/// Postgres-backed [`RecordStore`].
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store can be
/// shared across tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Handle to the underlying pool, for components that keep their own tables.
    pub fn pool(&self) -> PgPool {
        (*self.pool).clone()
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, business), fields(business_id = %business.id), err)]
    async fn insert_business(&self, business: Business) -> Result<Business, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, owner_id, name, email, phone, address, logo_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(business.id.as_uuid())
        .bind(business.owner_id.as_uuid())
        .bind(&business.name)
        .bind(&business.contact.email)
        .bind(&business.contact.phone)
        .bind(&business.contact.address)
        .bind(&business.logo_url)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_business", e))?;
        Ok(business)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    async fn business_by_owner(&self, owner_id: IdentityId) -> Result<Vec<Business>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, name, email, phone, address, logo_url, created_at, updated_at
            FROM businesses
            WHERE owner_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("business_by_owner", e))?;

        rows.iter().map(business_from_row).collect()
    }

    #[instrument(skip(self), fields(business_id = %business_id), err)]
    async fn business(&self, business_id: BusinessId) -> Result<Option<Business>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, name, email, phone, address, logo_url, created_at, updated_at
            FROM businesses
            WHERE id = $1
            "#,
        )
        .bind(business_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("business", e))?;

        row.as_ref().map(business_from_row).transpose()
    }

    #[instrument(skip(self, business), fields(business_id = %business.id), err)]
    async fn update_business(&self, business: Business) -> Result<Business, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET name = $2, email = $3, phone = $4, address = $5, logo_url = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(business.id.as_uuid())
        .bind(&business.name)
        .bind(&business.contact.email)
        .bind(&business.contact.phone)
        .bind(&business.contact.address)
        .bind(&business.logo_url)
        .bind(business.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_business", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("business"));
        }
        Ok(business)
    }

    #[instrument(skip(self), err)]
    async fn count_businesses(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM businesses")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_businesses", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_businesses", e))?;
        Ok(total.max(0) as u64)
    }

    #[instrument(
        skip(self, role, permissions),
        fields(role_id = %role.id, business_id = %role.business_id, rows = permissions.len()),
        err
    )]
    async fn insert_role_with_permissions(
        &self,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Result<(Role, Vec<Permission>), StoreError> {
        if permissions.iter().any(|p| p.role_id != role.id) {
            return Err(StoreError::Rejected("permission row references another role".to_string()));
        }

        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, business_id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.business_id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;

        for permission in &permissions {
            insert_permission(&mut tx, permission).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok((role, permissions))
    }

    #[instrument(skip(self), fields(business_id = %business_id), err)]
    async fn roles_for_business(&self, business_id: BusinessId, page: Page) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, business_id, name, description, created_at, updated_at
            FROM roles
            WHERE business_id = $1
            ORDER BY lower(name) ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(business_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("roles_for_business", e))?;

        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn role(&self, role_id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, business_id, name, description, created_at, updated_at
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("role", e))?;

        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self, role), fields(role_id = %role.id), err)]
    async fn update_role(&self, role: Role) -> Result<Role, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role"));
        }
        Ok(role)
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn delete_role_cascade(&self, role_id: RoleId) -> Result<DeletedRole, StoreError> {
        let mut tx = self.begin().await?;

        let removed = sqlx::query("DELETE FROM permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_permissions", e))?;

        sqlx::query("DELETE FROM employee_roles WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_employee_roles", e))?;

        let row = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            RETURNING id, business_id, name, description, created_at, updated_at
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_role", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound("role"));
        };
        let role = role_from_row(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(DeletedRole {
            role,
            permissions_removed: removed.rows_affected() as usize,
        })
    }

    #[instrument(skip(self, role_ids), fields(roles = role_ids.len()), err)]
    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = role_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = ANY($1) ORDER BY role_id, module"
        ))
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("permissions_for_roles", e))?;

        rows.iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), fields(role_id = %role_id, module = %module), err)]
    async fn permission(&self, role_id: RoleId, module: Module) -> Result<Option<Permission>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE role_id = $1 AND module = $2"
        ))
        .bind(role_id.as_uuid())
        .bind(module.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("permission", e))?;

        row.as_ref().map(permission_from_row).transpose()
    }

    #[instrument(
        skip(self, now),
        fields(role_id = %role_id, module = %module, capability = %capability),
        err
    )]
    async fn upsert_capability(
        &self,
        role_id: RoleId,
        module: Module,
        capability: Capability,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<Permission, StoreError> {
        let seed = CapabilitySet::only(capability, value);
        // `column()` comes from a closed enum, never from caller input.
        let column = capability.column();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO permissions ({PERMISSION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (role_id, module)
            DO UPDATE SET {column} = EXCLUDED.{column}, updated_at = EXCLUDED.updated_at
            RETURNING {PERMISSION_COLUMNS}
            "#
        ))
        .bind(PermissionId::new().as_uuid())
        .bind(role_id.as_uuid())
        .bind(module.as_str())
        .bind(seed.create)
        .bind(seed.read)
        .bind(seed.update)
        .bind(seed.delete)
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(upsert_capability_error)?;

        permission_from_row(&row)
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id), err)]
    async fn insert_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO employees ({EMPLOYEE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(employee.id.as_uuid())
        .bind(employee.business_id.as_uuid())
        .bind(employee.branch_id.map(|id| *id.as_uuid()))
        .bind(employee.identity_id.map(|id| *id.as_uuid()))
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.hire_date)
        .bind(employee.status.as_str())
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_employee", e))?;
        Ok(employee)
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id), err)]
    async fn update_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE employees
            SET branch_id = $2, name = $3, email = $4, phone = $5, address = $6,
                hire_date = $7, status = $8, updated_at = $9
            WHERE id = $1
            RETURNING {EMPLOYEE_COLUMNS}
            "#
        ))
        .bind(employee.id.as_uuid())
        .bind(employee.branch_id.map(|id| *id.as_uuid()))
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.hire_date)
        .bind(employee.status.as_str())
        .bind(employee.updated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_employee", e))?;

        match row {
            Some(row) => employee_from_row(&row),
            None => Err(StoreError::NotFound("employee")),
        }
    }

    #[instrument(skip(self), fields(business_id = %business_id), err)]
    async fn employees_for_business(
        &self,
        business_id: BusinessId,
        page: Page,
    ) -> Result<Vec<EmployeeProfile>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE business_id = $1 ORDER BY name, id LIMIT $2 OFFSET $3"
        ))
        .bind(business_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("employees_for_business", e))?;

        rows.iter().map(employee_from_row).collect()
    }

    #[instrument(skip(self), fields(employee_id = %employee_id), err)]
    async fn employee(&self, employee_id: EmployeeId) -> Result<Option<EmployeeProfile>, StoreError> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"))
            .bind(employee_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("employee", e))?;

        row.as_ref().map(employee_from_row).transpose()
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn employee_by_identity(&self, identity_id: IdentityId) -> Result<Option<EmployeeProfile>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE identity_id = $1"
        ))
        .bind(identity_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("employee_by_identity", e))?;

        row.as_ref().map(employee_from_row).transpose()
    }

    #[instrument(skip(self), fields(employee_id = %employee_id, role_id = %role_id), err)]
    async fn assign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO employee_roles (employee_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (employee_id, role_id) DO NOTHING
            "#,
        )
        .bind(employee_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_role", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(employee_id = %employee_id, role_id = %role_id), err)]
    async fn unassign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM employee_roles WHERE employee_id = $1 AND role_id = $2")
            .bind(employee_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("unassign_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(employee_id = %employee_id), err)]
    async fn roles_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<RoleId>, StoreError> {
        let rows = sqlx::query("SELECT role_id FROM employee_roles WHERE employee_id = $1 ORDER BY role_id")
            .bind(employee_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("roles_for_employee", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("role_id")
                    .map(RoleId::from_uuid)
                    .map_err(|e| map_sqlx_error("roles_for_employee", e))
            })
            .collect()
    }
}

async fn insert_permission(tx: &mut Transaction<'_, Postgres>, permission: &Permission) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO permissions ({PERMISSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
    ))
    .bind(permission.id.as_uuid())
    .bind(permission.role_id.as_uuid())
    .bind(permission.module.as_str())
    .bind(permission.capabilities.create)
    .bind(permission.capabilities.read)
    .bind(permission.capabilities.update)
    .bind(permission.capabilities.delete)
    .bind(permission.created_at)
    .bind(permission.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_permission", e))?;
    Ok(())
}

fn business_from_row(row: &PgRow) -> Result<Business, StoreError> {
    let map = |e| map_sqlx_error("decode_business", e);
    Ok(Business {
        id: BusinessId::from_uuid(row.try_get("id").map_err(map)?),
        owner_id: IdentityId::from_uuid(row.try_get("owner_id").map_err(map)?),
        name: row.try_get("name").map_err(map)?,
        contact: ContactInfo {
            email: row.try_get("email").map_err(map)?,
            phone: row.try_get("phone").map_err(map)?,
            address: row.try_get("address").map_err(map)?,
        },
        logo_url: row.try_get("logo_url").map_err(map)?,
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    let map = |e| map_sqlx_error("decode_role", e);
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(map)?),
        business_id: BusinessId::from_uuid(row.try_get("business_id").map_err(map)?),
        name: row.try_get("name").map_err(map)?,
        description: row.try_get("description").map_err(map)?,
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

fn permission_from_row(row: &PgRow) -> Result<Permission, StoreError> {
    let map = |e| map_sqlx_error("decode_permission", e);
    let module: String = row.try_get("module").map_err(map)?;
    let module: Module = module
        .parse()
        .map_err(|e| StoreError::Backend(format!("stored permission row: {e}")))?;
    Ok(Permission {
        id: PermissionId::from_uuid(row.try_get("id").map_err(map)?),
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(map)?),
        module,
        capabilities: CapabilitySet {
            create: row.try_get("create_permission").map_err(map)?,
            read: row.try_get("read_permission").map_err(map)?,
            update: row.try_get("update_permission").map_err(map)?,
            delete: row.try_get("delete_permission").map_err(map)?,
        },
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

fn employee_from_row(row: &PgRow) -> Result<EmployeeProfile, StoreError> {
    let map = |e| map_sqlx_error("decode_employee", e);
    let status: String = row.try_get("status").map_err(map)?;
    let status: EmployeeStatus = status
        .parse()
        .map_err(|e| StoreError::Backend(format!("stored employee row: {e}")))?;
    let branch_id: Option<Uuid> = row.try_get("branch_id").map_err(map)?;
    let identity_id: Option<Uuid> = row.try_get("identity_id").map_err(map)?;
    let hire_date: Option<NaiveDate> = row.try_get("hire_date").map_err(map)?;
    Ok(EmployeeProfile {
        id: EmployeeId::from_uuid(row.try_get("id").map_err(map)?),
        business_id: BusinessId::from_uuid(row.try_get("business_id").map_err(map)?),
        branch_id: branch_id.map(BranchId::from_uuid),
        identity_id: identity_id.map(IdentityId::from_uuid),
        name: row.try_get("name").map_err(map)?,
        email: row.try_get("email").map_err(map)?,
        phone: row.try_get("phone").map_err(map)?,
        address: row.try_get("address").map_err(map)?,
        hire_date,
        status,
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
    })
}

/// A missing role surfaces as a foreign key violation on `permissions.role_id`.
fn upsert_capability_error(err: sqlx::Error) -> StoreError {
    let missing_role = matches!(
        &err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503")
    );
    if missing_role {
        StoreError::NotFound("role")
    } else {
        map_sqlx_error("upsert_capability", err)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique violation
                Some("23505") => StoreError::Conflict(msg),
                // foreign key / check violation and the rest
                _ => StoreError::Rejected(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct CodedError(&'static str);

    impl std::fmt::Display for CodedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for CodedError {}

    impl sqlx::error::DatabaseError for CodedError {
        fn message(&self) -> &str {
            "database said no"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(CodedError(code)))
    }

    #[test]
    fn only_foreign_key_violation_means_missing_role() {
        assert_eq!(upsert_capability_error(db_error("23503")), StoreError::NotFound("role"));
        assert!(matches!(upsert_capability_error(db_error("23514")), StoreError::Rejected(_)));
        assert!(matches!(upsert_capability_error(db_error("23505")), StoreError::Conflict(_)));
        assert!(matches!(upsert_capability_error(sqlx::Error::PoolClosed), StoreError::Backend(_)));
    }

    #[test]
    fn schema_enforces_one_row_per_role_and_module() {
        assert!(SCHEMA.iter().any(|s| s.contains("UNIQUE (role_id, module)")));
    }

    #[test]
    fn schema_enforces_role_name_per_business() {
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("roles_business_name_key") && s.contains("lower(name)")));
    }

    #[test]
    fn pool_closed_maps_to_backend() {
        assert!(matches!(
            map_sqlx_error("upsert_capability", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn row_not_found_maps_to_backend() {
        assert!(matches!(
            map_sqlx_error("upsert_capability", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}
