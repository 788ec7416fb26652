use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::AuthenticatedUser,
};

/// Resources whose mutation is limited to one user, e.g. the author of a course.
#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

pub async fn check_access<T: HasOwner<OwnerId = O> + Sync, O: PartialEq + Send + Sync>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()> {
    // admin can get all resources
    if ctx.is_admin() {
        return Ok(());
    }

    let actual_owner = resource.get_owner_id(mm, ctx).await?;

    if actual_owner == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}
