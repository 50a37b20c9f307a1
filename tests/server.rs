use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use bulletin_board::{BoardRegistry, BulletinServer, ServerConfig};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: SocketAddr,
    registry: Arc<BoardRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig::default();
        let registry = Arc::new(BoardRegistry::from_config(&config));
        let server = BulletinServer::new(listener, registry, config.max_line_length);
        let registry = server.registry();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.unwrap();
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for line")
            .unwrap()
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(expected));
    }
}

async fn wait_for_members(registry: &BoardRegistry, group: &str, count: usize) {
    let board = registry.get(group).unwrap();
    timeout(READ_TIMEOUT, async {
        while board.member_count().await != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("board membership did not settle");
}

#[tokio::test]
async fn groups_lists_default_boards() {
    let server = TestServer::start().await;
    let mut client = Client::connect(server.addr).await;

    client.send("GROUPS").await;
    client
        .expect("GROUPS|Public|Group1|Group2|Group3|Group4|Group5")
        .await;

    client.send("PING").await;
    client.expect("PING").await;

    server.stop().await;
}

#[tokio::test]
async fn alice_and_bob_share_a_post() {
    let server = TestServer::start().await;
    let mut alice = Client::connect(server.addr).await;
    let mut bob = Client::connect(server.addr).await;

    alice.send("JOIN|Public|alice").await;
    alice.expect("JOIN|Public|alice").await;

    bob.send("JOIN|Public|bob").await;
    bob.expect("JOIN|Public|bob").await;
    bob.expect("JOIN|Public|alice").await;
    alice.expect("JOIN|Public|bob").await;

    alice.send("POST|Public|hi|hello world").await;
    let announced = alice.recv().await.unwrap();
    assert!(announced.starts_with("MESSAGE|Public|"));
    bob.expect(&announced).await;

    let id = announced.rsplit('|').next().unwrap().to_string();
    for client in [&mut alice, &mut bob] {
        client.send(&format!("VIEW|Public|{}", id)).await;
        let view = client.recv().await.unwrap();
        let fields: Vec<&str> = view.split('|').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[..4], ["VIEW", "Public", id.as_str(), "alice"]);
        assert_eq!(fields[5..], ["hi", "hello world"]);
    }

    server.stop().await;
}

#[tokio::test]
async fn late_joiner_catches_up_on_two_most_recent() {
    let server = TestServer::start().await;
    let mut alice = Client::connect(server.addr).await;

    alice.send("JOIN|Group3|alice").await;
    alice.expect("JOIN|Group3|alice").await;

    let mut ids = Vec::new();
    for n in 0..3 {
        alice.send(&format!("POST|Group3|s{}|c{}", n, n)).await;
        let line = alice.recv().await.unwrap();
        ids.push(line.rsplit('|').next().unwrap().to_string());
    }

    let mut carol = Client::connect(server.addr).await;
    carol.send("JOIN|Group3|carol").await;
    carol.expect("JOIN|Group3|carol").await;
    carol.expect(&format!("MESSAGE|Group3|{}", ids[1])).await;
    carol.expect(&format!("MESSAGE|Group3|{}", ids[2])).await;
    carol.expect("JOIN|Group3|alice").await;

    server.stop().await;
}

#[tokio::test]
async fn disconnect_broadcasts_leave_on_every_board() {
    let server = TestServer::start().await;
    let mut watcher = Client::connect(server.addr).await;
    let mut leaver = Client::connect(server.addr).await;

    let groups = ["Group1", "Group2", "Group4"];
    for group in groups {
        watcher.send(&format!("JOIN|{}|watcher", group)).await;
        watcher.expect(&format!("JOIN|{}|watcher", group)).await;
        leaver.send(&format!("JOIN|{}|leaver", group)).await;
        leaver.expect(&format!("JOIN|{}|leaver", group)).await;
        leaver.expect(&format!("JOIN|{}|watcher", group)).await;
        watcher.expect(&format!("JOIN|{}|leaver", group)).await;
    }

    drop(leaver);

    let mut leaves = Vec::new();
    for _ in groups {
        leaves.push(watcher.recv().await.unwrap());
    }
    leaves.sort();
    assert_eq!(
        leaves,
        vec![
            "LEAVE|Group1|leaver",
            "LEAVE|Group2|leaver",
            "LEAVE|Group4|leaver",
        ]
    );

    for group in groups {
        wait_for_members(&server.registry, group, 1).await;
    }

    server.stop().await;
}

#[tokio::test]
async fn fail_quiet_requests_get_no_reply() {
    let server = TestServer::start().await;
    let mut client = Client::connect(server.addr).await;

    client.send("JOIN|NoSuchBoard|alice").await;
    client.send("POST|Public|not|joined").await;
    client.send("VIEW|Public|12").await;
    client.send("VIEW|Public|twelve").await;
    client.send("LEAVE|Public").await;
    client.send("USERS|Public").await;
    client.send("FROBNICATE").await;
    client.send("PING").await;

    // PING is the only thing that answers
    client.expect("PING").await;
    assert_eq!(
        server.registry.get("Public").unwrap().message_count().await,
        0
    );

    server.stop().await;
}

#[tokio::test]
async fn exit_closes_connection() {
    let server = TestServer::start().await;
    let mut client = Client::connect(server.addr).await;

    client.send("JOIN|Public|alice").await;
    client.expect("JOIN|Public|alice").await;
    client.send("EXIT").await;

    assert_eq!(client.recv().await, None);
    wait_for_members(&server.registry, "Public", 0).await;

    server.stop().await;
}

#[tokio::test]
async fn users_lists_everyone_on_the_board() {
    let server = TestServer::start().await;
    let mut alice = Client::connect(server.addr).await;
    let mut bob = Client::connect(server.addr).await;

    alice.send("JOIN|Group5|alice").await;
    alice.expect("JOIN|Group5|alice").await;
    bob.send("JOIN|Group5|bob").await;
    bob.expect("JOIN|Group5|bob").await;
    bob.expect("JOIN|Group5|alice").await;
    alice.expect("JOIN|Group5|bob").await;

    bob.send("USERS|Group5").await;
    let users = bob.recv().await.unwrap();
    let mut names: Vec<&str> = users.split('|').skip(2).collect();
    names.sort();
    assert!(users.starts_with("USERS|Group5|"));
    assert_eq!(names, vec!["alice", "bob"]);

    server.stop().await;
}
