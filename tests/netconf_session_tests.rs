//! End-to-end management sessions over in-memory streams and TCP.

#[cfg(test)]
mod netconf_session_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{duplex, split, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use optisim::netconf::rpc::{self, Message};
    use optisim::netconf::{
        Datastore, Dispatcher, FrameReader, FrameWriter, FramingError, NetconfServer, Operation, RpcRequest,
        Session, SessionError, SessionSettings,
    };
    use optisim::topology::Preset;

    const WAIT: Duration = Duration::from_secs(5);

    struct Client<R, W> {
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
    }

    impl<R, W> Client<R, W>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: tokio::io::AsyncWrite + Unpin,
    {
        async fn recv(&mut self) -> Option<String> {
            timeout(WAIT, self.reader.read_frame())
                .await
                .expect("timed out waiting for the server")
                .expect("framing error on client side")
        }

        async fn send(&mut self, payload: &str) {
            self.writer.write_frame(payload).await.unwrap();
        }

        async fn call(&mut self, message_id: &str, operation: Operation) -> String {
            self.send(&RpcRequest::new(message_id, operation).render()).await;
            self.recv().await.expect("session closed before replying")
        }

        /// Receive the server hello and answer it
        async fn handshake(&mut self) -> rpc::Hello {
            let hello = self.recv().await.expect("no server hello");
            let Ok(Message::Hello(hello)) = rpc::parse_message(&hello) else {
                panic!("server did not open with hello: {}", hello);
            };
            self.send(&rpc::client_hello()).await;
            hello
        }
    }

    type DuplexClient = Client<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn start_session(id: u32) -> (DuplexClient, JoinHandle<Result<(), SessionError>>, Arc<Dispatcher>) {
        let topology = Arc::new(Preset::PointToPoint.build().unwrap());
        let dispatcher = Arc::new(Dispatcher::new(topology));
        let (server_side, client_side) = duplex(64 * 1024);

        let (reader, writer) = split(server_side);
        let session = Session::new(id, reader, writer, Arc::clone(&dispatcher), SessionSettings::default());
        let handle = tokio::spawn(session.run());

        let (reader, writer) = split(client_side);
        let client = Client {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        };
        (client, handle, dispatcher)
    }

    async fn finish(handle: JoinHandle<Result<(), SessionError>>) -> Result<(), SessionError> {
        timeout(WAIT, handle)
            .await
            .expect("session did not end")
            .expect("session task panicked")
    }

    fn get(element_id: &str) -> Operation {
        Operation::Get {
            element_id: element_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_handshake_get_and_close() {
        let (mut client, handle, _) = start_session(7);

        let hello = client.handshake().await;
        assert_eq!(hello.session_id, Some(7));
        assert!(hello.supports(rpc::BASE_CAPABILITY));
        assert!(hello.supports(rpc::WRITABLE_RUNNING_CAPABILITY));

        let reply = client.call("101", get("OTN-TXP-NYC-001")).await;
        assert!(reply.contains("message-id=\"101\""));
        assert!(reply.contains("<ne-type>transponder</ne-type>"));
        assert!(reply.contains("<location>New York DataCenter</location>"));
        assert_eq!(reply.matches("<interface>").count(), 10);

        let reply = client.call("102", Operation::CloseSession).await;
        assert!(reply.contains("message-id=\"102\""));
        assert!(reply.contains("<ok/>"));

        assert!(finish(handle).await.is_ok());
        assert_eq!(client.recv().await, None);
    }

    #[tokio::test]
    async fn test_edit_config_is_visible_to_get_config() {
        let (mut client, handle, dispatcher) = start_session(1);
        client.handshake().await;

        let reply = client
            .call(
                "1",
                Operation::EditConfig {
                    element_id: "EDFA-REPEAT-001".to_string(),
                    target: Datastore::Running,
                    changes: vec![
                        ("hostname".to_string(), "repeater-1".to_string()),
                        ("ntp-enabled".to_string(), "false".to_string()),
                    ],
                },
            )
            .await;
        assert!(reply.contains("<ok/>"), "unexpected reply: {}", reply);

        let reply = client
            .call(
                "2",
                Operation::GetConfig {
                    element_id: "EDFA-REPEAT-001".to_string(),
                    source: Datastore::Running,
                },
            )
            .await;
        assert!(reply.contains("<hostname>repeater-1</hostname>"));
        assert!(reply.contains("<ntp-enabled>false</ntp-enabled>"));
        assert!(reply.contains("<logging-level>info</logging-level>"));

        assert_eq!(
            dispatcher.configuration("EDFA-REPEAT-001").unwrap()["hostname"],
            "repeater-1"
        );

        drop(client);
        assert!(finish(handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_and_malformed_requests_get_errors() {
        let (mut client, handle, _) = start_session(2);
        client.handshake().await;

        client
            .send("<rpc message-id=\"5\"><kill-session><session-id>1</session-id></kill-session></rpc>")
            .await;
        let reply = client.recv().await.unwrap();
        assert!(reply.contains("message-id=\"5\""));
        assert!(reply.contains("<error-type>protocol</error-type>"));
        assert!(reply.contains("<error-tag>operation-not-supported</error-tag>"));
        assert!(reply.contains("kill-session"));

        client.send("<rpc message-id=\"6\"><get>").await;
        let reply = client.recv().await.unwrap();
        assert!(reply.contains("<error-tag>malformed-message</error-tag>"));

        let reply = client.call("7", get("NO-SUCH-NE")).await;
        assert!(reply.contains("<error-type>application</error-type>"));
        assert!(reply.contains("<error-tag>invalid-value</error-tag>"));

        client.send(&rpc::client_hello()).await;
        let reply = client.recv().await.unwrap();
        assert!(reply.contains("<error-tag>operation-not-supported</error-tag>"));

        // Still serving after every error
        let reply = client.call("8", get("OTN-TXP-BOS-001")).await;
        assert!(reply.contains("<status>operational</status>"));

        client.call("9", Operation::CloseSession).await;
        assert!(finish(handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_rpc_before_hello_ends_session() {
        let (mut client, handle, _) = start_session(3);

        let hello = client.recv().await.unwrap();
        assert!(hello.contains("<session-id>3</session-id>"));
        client.send(&RpcRequest::new("1", get("OTN-TXP-NYC-001")).render()).await;

        assert!(matches!(finish(handle).await, Err(SessionError::Handshake(_))));
        assert_eq!(client.recv().await, None);
    }

    #[tokio::test]
    async fn test_hello_without_base_capability_is_refused() {
        let (mut client, handle, _) = start_session(4);

        client.recv().await.unwrap();
        client
            .send("<hello><capabilities><capability>urn:example:other</capability></capabilities></hello>")
            .await;

        assert!(matches!(finish(handle).await, Err(SessionError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_missing_delimiter_at_eof_is_a_framing_error() {
        let (mut client, handle, _) = start_session(5);
        client.handshake().await;

        // Bypass framing: raw bytes, no delimiter, then end of stream
        let mut raw = client.writer.into_inner();
        raw.write_all(b"<rpc message-id=\"1\"><close-session/></rpc>").await.unwrap();
        raw.shutdown().await.unwrap();

        assert!(matches!(
            finish(handle).await,
            Err(SessionError::Framing(FramingError::UnexpectedEof(_)))
        ));
    }

    #[tokio::test]
    async fn test_tcp_sessions_get_distinct_ids() {
        let topology = Arc::new(Preset::Ring.build().unwrap());
        let dispatcher = Arc::new(Dispatcher::new(topology));
        let server = NetconfServer::bind("127.0.0.1:0", dispatcher, SessionSettings::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let server = tokio::spawn(server.run());

        let mut session_ids = Vec::new();
        for _ in 0..2 {
            let (reader, writer) = TcpStream::connect(addr).await.unwrap().into_split();
            let mut client = Client {
                reader: FrameReader::new(reader),
                writer: FrameWriter::new(writer),
            };
            let hello = client.handshake().await;
            session_ids.push(hello.session_id.unwrap());

            let reply = client.call("1", get("EDFA-SPAN-1")).await;
            assert!(!reply.contains("<rpc-error>"), "unexpected reply: {}", reply);
            client.call("2", Operation::CloseSession).await;
            assert_eq!(client.recv().await, None);
        }

        assert_eq!(session_ids, vec![1, 2]);
        server.abort();
    }
}
