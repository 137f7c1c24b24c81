//! Integration tests for the ownership-tree repositories using in-memory
//! SurrealDB.

use std::collections::BTreeMap;

use distr_core::error::ErrorKind;
use distr_core::models::credentials::{
    AwsCredentials, Credentials, OtherCredentials, SealedCredentials,
};
use distr_core::models::deployment::{CreateDeployment, UpdateDeployment};
use distr_core::models::organisation::CreateOrganisation;
use distr_core::models::resource::{CreateResource, UpdateResource};
use distr_core::models::system::{CreateSystem, UpdateSystem};
use distr_core::repository::{
    DeploymentRepository, OrganisationRepository, ResourceRepository, SystemRepository,
};
use distr_db::repository::{
    SurrealDeploymentRepository, SurrealOrganisationRepository, SurrealResourceRepository,
    SurrealSystemRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    distr_db::run_migrations(&db).await.unwrap();
    db
}

fn sealed_aws() -> SealedCredentials {
    SealedCredentials::from_ciphertext(Credentials::Aws(AwsCredentials {
        id: "AKIA".into(),
        secret: "Y2lwaGVy|bm9uY2U=".into(),
        region: "eu-west-1".into(),
    }))
}

#[tokio::test]
async fn create_and_get_organisation() {
    let db = setup().await;
    let repo = SurrealOrganisationRepository::new(db);

    let org = repo
        .create(CreateOrganisation {
            name: "ACME Corp".into(),
        })
        .await
        .unwrap();
    assert_eq!(org.name, "ACME Corp");

    let fetched = repo.get_by_id(org.id).await.unwrap();
    assert_eq!(fetched.id, org.id);
    assert_eq!(fetched.name, "ACME Corp");
}

#[tokio::test]
async fn missing_organisation_is_not_found() {
    let db = setup().await;
    let repo = SurrealOrganisationRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn systems_are_listed_per_organisation() {
    let db = setup().await;
    let repo = SurrealSystemRepository::new(db);
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();

    let web = repo
        .create(CreateSystem {
            organisation_id: org_a,
            name: "web".into(),
            description: Some("storefront".into()),
        })
        .await
        .unwrap();
    repo.create(CreateSystem {
        organisation_id: org_a,
        name: "batch".into(),
        description: None,
    })
    .await
    .unwrap();
    repo.create(CreateSystem {
        organisation_id: org_b,
        name: "other".into(),
        description: None,
    })
    .await
    .unwrap();

    assert_eq!(web.description, "storefront");

    let systems = repo.list_by_organisation(org_a).await.unwrap();
    assert_eq!(systems.len(), 2);
    assert!(systems.iter().all(|s| s.organisation_id == org_a));

    let updated = repo
        .update(
            web.id,
            UpdateSystem {
                name: Some("webshop".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "webshop");
    assert_eq!(updated.description, "storefront");
}

#[tokio::test]
async fn deployment_credentials_are_stored_verbatim() {
    let db = setup().await;
    let repo = SurrealDeploymentRepository::new(db);
    let system_id = Uuid::new_v4();

    let deployment = repo
        .create(CreateDeployment {
            system_id,
            name: "production".into(),
            credentials: sealed_aws(),
        })
        .await
        .unwrap();

    let fetched = repo.get_by_id(deployment.id).await.unwrap();
    assert_eq!(fetched.system_id, system_id);
    assert_eq!(fetched.credentials, sealed_aws());
}

#[tokio::test]
async fn updating_credentials_replaces_the_variant() {
    let db = setup().await;
    let repo = SurrealDeploymentRepository::new(db);

    let deployment = repo
        .create(CreateDeployment {
            system_id: Uuid::new_v4(),
            name: "staging".into(),
            credentials: sealed_aws(),
        })
        .await
        .unwrap();

    let other = SealedCredentials::from_ciphertext(Credentials::Other(OtherCredentials {
        values: BTreeMap::from([("token".to_string(), "dG9r|bm9uY2U=".to_string())]),
    }));
    let updated = repo
        .update(
            deployment.id,
            UpdateDeployment {
                name: None,
                credentials: Some(other.clone()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "staging");
    assert_eq!(updated.credentials, other);
    assert!(updated.credentials.as_ciphertext().aws().is_none());

    let listed = repo.list_by_system(deployment.system_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].credentials, other);
}

#[tokio::test]
async fn resource_keeps_caller_supplied_id() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);
    let id = Uuid::new_v4();
    let deployment_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();

    let resource = repo
        .create(CreateResource {
            id,
            deployment_id,
            service_id,
            name: "logs-bucket".into(),
        })
        .await
        .unwrap();
    assert_eq!(resource.id, id);

    let renamed = repo
        .update(
            id,
            UpdateResource {
                name: Some("audit-bucket".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "audit-bucket");
    assert_eq!(renamed.service_id, service_id);

    let listed = repo.list_by_deployment(deployment_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
}
