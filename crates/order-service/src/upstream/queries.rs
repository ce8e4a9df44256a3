//! GraphQL operations sent to the user and product services.
//!
//! Both schemas only use built-in scalars (`ID` → `String`, `Float` → `f64`,
//! `Int` → `i64`), so no scalar aliases are needed here.

use graphql_client::GraphQLQuery;

/// The caller's own profile, resolved from the forwarded bearer token.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/user/schema.graphql",
    query_path = "graphql/user/queries/current_user.graphql",
    response_derives = "Debug, Clone"
)]
pub struct CurrentUser;

/// A single catalog product by ID.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/product/schema.graphql",
    query_path = "graphql/product/queries/product_by_id.graphql",
    response_derives = "Debug, Clone"
)]
pub struct ProductById;
