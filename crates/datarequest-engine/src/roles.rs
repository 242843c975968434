use std::sync::Arc;

use datarequest_types::{Principal, RequestId, Role, RoleSet};

use crate::collaborators::GroupDirectory;
use crate::config::GroupConfig;
use crate::error::WorkflowResult;
use crate::records::{keys, RequestRecords};

/// Computes the roles a principal holds, globally or for one request.
///
/// Nothing is cached: every call reads the directory and the request's
/// current owner and reviewer sets.
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn GroupDirectory>,
    records: RequestRecords,
    groups: GroupConfig,
}

impl RoleResolver {
    pub fn new(
        directory: Arc<dyn GroupDirectory>,
        records: RequestRecords,
        groups: GroupConfig,
    ) -> Self {
        Self {
            directory,
            records,
            groups,
        }
    }

    /// Directory group that confers `role`, for the group-based roles.
    pub fn group_of(&self, role: Role) -> Option<&str> {
        match role {
            Role::Pm => Some(&self.groups.project_managers),
            Role::Dm => Some(&self.groups.data_managers),
            Role::Dac => Some(&self.groups.data_access_committee),
            Role::Own | Role::Rev | Role::PenRev => None,
        }
    }

    /// Members of a group-based role; empty for request-scoped roles.
    pub async fn members(&self, role: Role) -> WorkflowResult<Vec<Principal>> {
        match self.group_of(role) {
            Some(group) => Ok(self.directory.members_of(group).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Roles of `principal`. Without a request only PM, DM and DAC are
    /// computed.
    pub async fn roles_for(
        &self,
        principal: &Principal,
        request_id: Option<RequestId>,
    ) -> WorkflowResult<RoleSet> {
        let mut roles = RoleSet::new();
        for role in [Role::Pm, Role::Dm, Role::Dac] {
            if let Some(group) = self.group_of(role) {
                if self.directory.is_member(principal, group).await? {
                    roles.insert(role);
                }
            }
        }

        let Some(id) = request_id else {
            return Ok(roles);
        };

        if self.records.owner(id).await?.as_ref() == Some(principal) {
            roles.insert(Role::Own);
        }

        let pending = self.records.principals(id, keys::ASSIGNED_FOR_REVIEW).await?;
        let completed = self.records.principals(id, keys::REVIEWED_BY).await?;
        if pending.contains(principal) {
            roles.insert(Role::PenRev);
            roles.insert(Role::Rev);
        } else if completed.contains(principal) {
            roles.insert(Role::Rev);
        }

        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StaticDirectory;
    use datarequest_store::InMemoryStorage;

    async fn resolver() -> RoleResolver {
        let groups = GroupConfig::default();
        let directory = StaticDirectory::new()
            .with_group(groups.project_managers.clone(), &["pat"])
            .with_group(groups.data_managers.clone(), &["dana", "pat"])
            .with_group(groups.data_access_committee.clone(), &["m1", "m2", "alice"]);
        let records = RequestRecords::new(Arc::new(InMemoryStorage::new()), "/z/requests");
        records.create(RequestId(1), &Principal::new("alice")).await.unwrap();
        records
            .set_principals(RequestId(1), keys::ASSIGNED_FOR_REVIEW, &[Principal::new("m1")])
            .await
            .unwrap();
        records
            .set_principals(RequestId(1), keys::REVIEWED_BY, &[Principal::new("m2")])
            .await
            .unwrap();
        RoleResolver::new(Arc::new(directory), records, groups)
    }

    #[tokio::test]
    async fn group_roles_without_request() {
        let resolver = resolver().await;
        let roles = resolver.roles_for(&Principal::new("pat"), None).await.unwrap();
        assert_eq!(roles, RoleSet::from([Role::Pm, Role::Dm]));

        let roles = resolver.roles_for(&Principal::new("alice"), None).await.unwrap();
        assert_eq!(roles, RoleSet::from([Role::Dac]));
    }

    #[tokio::test]
    async fn request_scoped_roles() {
        let resolver = resolver().await;
        let id = Some(RequestId(1));

        let owner = resolver.roles_for(&Principal::new("alice"), id).await.unwrap();
        assert_eq!(owner, RoleSet::from([Role::Dac, Role::Own]));

        let pending = resolver.roles_for(&Principal::new("m1"), id).await.unwrap();
        assert_eq!(pending, RoleSet::from([Role::Dac, Role::Rev, Role::PenRev]));

        let done = resolver.roles_for(&Principal::new("m2"), id).await.unwrap();
        assert_eq!(done, RoleSet::from([Role::Dac, Role::Rev]));

        let stranger = resolver.roles_for(&Principal::new("zed"), id).await.unwrap();
        assert!(stranger.is_empty());
    }
}
