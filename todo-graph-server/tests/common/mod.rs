use mongodb::Client;
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use todo_graph_server::config::Config;
use todo_graph_server::todo::MongoTodoStore;

pub const DATABASE_NAME: &str = "cluster0";
pub const COLLECTION_NAME: &str = "todos";

pub async fn setup_container() -> anyhow::Result<ContainerAsync<Mongo>> {
    let container = Mongo::default().start().await?;
    Ok(container)
}

pub async fn setup_store(container: &ContainerAsync<Mongo>) -> anyhow::Result<MongoTodoStore> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(27017).await?;
    let config = Config {
        mongo_uri: format!("mongodb://{}:{}/", host, port),
        port: 0,
        database_name: DATABASE_NAME.to_string(),
        collection_name: COLLECTION_NAME.to_string(),
    };
    let store = MongoTodoStore::connect(&config).await?;
    store.ping().await?;
    Ok(store)
}

/// Opens a separate client for inspecting raw documents.
pub async fn raw_client(container: &ContainerAsync<Mongo>) -> anyhow::Result<Client> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(27017).await?;
    let client = Client::with_uri_str(format!("mongodb://{}:{}/", host, port)).await?;
    Ok(client)
}
