use kgviz_database::{EntityRepository, RelationshipRepository};
use kgviz_models::{NewEntity, NewRelationship, DEFAULT_DOMAIN};
use std::collections::HashMap;

use super::GraphService;
use crate::errors::{GraphError, GraphResult};

const DEMO_ENTITIES: &[(&str, &str, &str)] = &[
    ("1", "人工智能", "研究如何使机器模拟人类智能的科学"),
    ("2", "机器学习", "人工智能的一个分支"),
    ("3", "深度学习", "机器学习的一个分支"),
    ("4", "神经网络", "受人脑结构启发的计算模型"),
    ("5", "计算机视觉", "使计算机能够从图像中获取理解的领域"),
];

const DEMO_RELATIONSHIPS: &[(&str, &str, &str)] = &[
    ("1", "2", "包含"),
    ("2", "3", "包含"),
    ("3", "4", "基于"),
    ("1", "5", "包含"),
    ("5", "3", "应用"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub entities: usize,
    pub relationships_created: usize,
}

impl GraphService {
    /// Writes the demo graph into the default domain. Demo entities are reset
    /// to their canonical content; missing demo relationships are added.
    pub async fn seed(&self) -> GraphResult<SeedSummary> {
        let mut tx = self.database().begin().await?;
        let mut pks = HashMap::new();

        for (id, name, description) in DEMO_ENTITIES {
            let fields = NewEntity {
                id: id.to_string(),
                name: name.to_string(),
                entity_type: String::new(),
                description: description.to_string(),
                domain: DEFAULT_DOMAIN.to_string(),
            };
            let entity = match EntityRepository::find(&mut *tx, id, DEFAULT_DOMAIN).await? {
                Some(existing) => EntityRepository::update(&mut *tx, existing.pk, &fields).await?,
                None => EntityRepository::insert(&mut *tx, &fields).await?,
            };
            pks.insert(*id, entity.pk);
        }

        let mut relationships_created = 0;
        for (source, target, rel_type) in DEMO_RELATIONSHIPS {
            let (Some(&source_pk), Some(&target_pk)) = (pks.get(source), pks.get(target)) else {
                return Err(GraphError::Internal(format!(
                    "demo relationship {} -> {} has no endpoint",
                    source, target
                )));
            };
            let existing = RelationshipRepository::find_existing(
                &mut *tx,
                source_pk,
                target_pk,
                rel_type,
                DEFAULT_DOMAIN,
            )
            .await?;
            if existing.is_none() {
                let new = NewRelationship {
                    source_pk,
                    target_pk,
                    rel_type: rel_type.to_string(),
                    description: String::new(),
                    domain: DEFAULT_DOMAIN.to_string(),
                };
                RelationshipRepository::insert(&mut *tx, &new).await?;
                relationships_created += 1;
            }
        }

        tx.commit().await?;
        tracing::info!(
            entities = DEMO_ENTITIES.len(),
            relationships_created,
            "Demo graph seeded"
        );
        Ok(SeedSummary {
            entities: DEMO_ENTITIES.len(),
            relationships_created,
        })
    }
}
