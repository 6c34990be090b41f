use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::components::{Doubler, Echo, Router};
use crate::config::NetworkOptions;
use crate::engine::{run, run_until, run_with, PortSet, Transport};
use crate::errors::{GraphError, RunError};
use crate::graph::{Graph, PortSpec};
use crate::traits::Process;

/// End-to-end tests that declare graphs, run them and observe their boundary transports
#[cfg(test)]
mod tests {
    use super::*;

    /// A process with one channel and one member that is not a channel.
    struct WithField;

    #[async_trait]
    impl Process for WithField {
        fn ports(&self) -> Vec<PortSpec> {
            vec![PortSpec::field::<i32>("NotChan"), PortSpec::input::<i32>("Chan")]
        }

        async fn run(&mut self, mut ports: PortSet) {
            if let Some(input) = ports.input::<i32>("Chan") {
                while input.recv().await.is_some() {}
            }
        }
    }

    /// Panics as soon as it starts, while holding its output lease.
    struct Faulty;

    #[async_trait]
    impl Process for Faulty {
        fn ports(&self) -> Vec<PortSpec> {
            vec![PortSpec::output::<i32>("Out")]
        }

        async fn run(&mut self, _ports: PortSet) {
            panic!("faulty process");
        }
    }

    /// Sends `count` values starting at `base`, pausing between each.
    struct Burst {
        base: i32,
        count: i32,
        pause: Duration,
    }

    #[async_trait]
    impl Process for Burst {
        fn ports(&self) -> Vec<PortSpec> {
            vec![PortSpec::output::<i32>("Out")]
        }

        async fn run(&mut self, mut ports: PortSet) {
            let Some(output) = ports.output::<i32>("Out") else {
                return;
            };
            for offset in 0..self.count {
                tokio::time::sleep(self.pause).await;
                if output.send(self.base + offset).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn drain(transport: &Transport<i32>) -> Vec<i32> {
        let mut values = Vec::new();
        while let Some(value) = transport.recv().await {
            values.push(value);
        }
        values.sort_unstable();
        values
    }

    fn feed<I>(transport: &Transport<i32>, values: I)
    where
        I: IntoIterator<Item = i32> + Send + 'static,
        I::IntoIter: Send,
    {
        let transport = transport.clone();
        tokio::spawn(async move {
            for value in values {
                transport.send(value).await.unwrap();
            }
            transport.close();
        });
    }

    fn two_echoes() -> Graph {
        let mut graph = Graph::new();
        graph.add("e1", Echo::<i32>::new()).unwrap();
        graph.add("e2", Echo::<i32>::new()).unwrap();
        graph.add("with_field", WithField).unwrap();
        graph
    }

    #[test]
    fn connect_reports_exact_errors() {
        let mut graph = two_echoes();

        let cases = [
            (("ghost", "Out", "e2", "In"), "connect: process 'ghost' not found"),
            (("e1", "Out", "ghost", "In"), "connect: process 'ghost' not found"),
            (
                ("e1", "Nope", "e2", "In"),
                "connect: process 'e1' does not have port 'Nope'",
            ),
            (
                ("e1", "Out", "e2", "In[k]"),
                "connect: process 'e2' does not have port 'In[k]'",
            ),
            (
                ("e1", "Out", "with_field", "NotChan"),
                "connect 'with_field.NotChan': not a channel",
            ),
            (
                ("e1", "Out", "e2", "Out"),
                "connect 'e2.Out': channel does not support direction <-chan",
            ),
            (
                ("e1", "In", "e2", "In"),
                "connect 'e1.In': channel does not support direction chan<-",
            ),
            // the sender end is checked before the receiver end
            (
                ("e1", "In", "ghost", "In"),
                "connect 'e1.In': channel does not support direction chan<-",
            ),
        ];

        for ((sender, sport, receiver, rport), expected) in cases {
            let err = graph.connect(sender, sport, receiver, rport).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }

        assert!(graph.connections().is_empty());
        assert_eq!(graph.len(), 3);
        assert!(graph.connect("e1", "Out", "with_field", "Chan").is_ok());
    }

    #[test]
    fn failed_declarations_leave_the_graph_unchanged() {
        let mut graph = two_echoes();
        graph.connect("e1", "Out", "e2", "In").unwrap();
        graph.map_in_port("In", "e1", "In").unwrap();

        assert!(graph.add("e1", Doubler::new()).is_err());
        assert!(graph.map_in_port("In", "e2", "In").is_err());
        assert!(graph.map_out_port("Out", "e2", "In").is_err());
        assert!(graph.add_iip("e2", "Out", 1).is_err());
        assert!(graph.add_iip("e2", "In", 1u8).is_err());

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.connections().len(), 1);
        assert_eq!(graph.exports().count(), 1);
        assert_eq!(graph.iip_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_out_and_fan_in_deliver_every_value_once() {
        let mut graph = Graph::new();
        graph.add("e1", Echo::<i32>::new()).unwrap();
        graph.add("d1", Doubler::new()).unwrap();
        graph.add("d2", Doubler::new()).unwrap();
        graph.add("d3", Doubler::new()).unwrap();
        graph.add("e2", Echo::<i32>::new()).unwrap();
        for doubler in ["d1", "d2", "d3"] {
            graph.connect("e1", "Out", doubler, "In").unwrap();
            graph.connect(doubler, "Out", "e2", "In").unwrap();
        }
        graph.map_in_port("In", "e1", "In").unwrap();
        graph.map_out_port("Out", "e2", "Out").unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::new();
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        feed(&input, 1..=8);

        let values = drain(&output).await;
        assert_eq!(values, vec![2, 4, 6, 8, 10, 12, 14, 16]);

        let summary = completion.await;
        assert!(summary.is_clean());
        assert_eq!(summary.processes, 5);
        assert_eq!(summary.transports, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn keyed_router_feeds_mapped_out_ports() {
        let mut graph = Graph::new();
        graph.add("r", Router::<i32>::new()).unwrap();
        for (key, value) in [("e1", 1), ("e2", 2), ("e3", 3)] {
            graph.add_iip("r", &format!("In[{key}]"), value).unwrap();
        }
        graph.map_out_port("O1", "r", "Out[e1]").unwrap();
        graph.map_out_port("O2", "r", "Out[e2]").unwrap();
        graph.map_out_port("O3", "r", "Out[e3]").unwrap();

        let outputs: Vec<_> = (0..3).map(|_| Transport::<i32>::new()).collect();
        for (name, transport) in ["O1", "O2", "O3"].into_iter().zip(&outputs) {
            graph.set_out_port(name, transport).unwrap();
        }

        let completion = run(graph).unwrap();

        for (expected, transport) in (1..=3).zip(&outputs) {
            assert_eq!(drain(transport).await, vec![expected]);
        }
        let summary = completion.await;
        assert_eq!(summary.initial_packets, 3);
        assert!(summary.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn router_between_echo_chains_keeps_keys_apart() {
        let mut graph = Graph::new();
        for name in ["e1", "e2", "e3", "e11", "e22", "e33"] {
            graph.add(name, Echo::<i32>::new()).unwrap();
        }
        graph.add("r", Router::<i32>::new()).unwrap();

        graph.connect("e1", "Out", "r", "In[e1]").unwrap();
        graph.connect("e2", "Out", "r", "In[e2]").unwrap();
        graph.connect("e33", "Out", "r", "In[e3]").unwrap();
        graph.connect("r", "Out[e3]", "e3", "In").unwrap();
        graph.connect("r", "Out[e2]", "e22", "In").unwrap();
        graph.connect("r", "Out[e1]", "e11", "In").unwrap();

        graph.add_iip("e1", "In", 1).unwrap();
        graph.add_iip("e2", "In", 2).unwrap();
        graph.add_iip("e33", "In", 3).unwrap();

        graph.map_out_port("O1", "e11", "Out").unwrap();
        graph.map_out_port("O2", "e22", "Out").unwrap();
        graph.map_out_port("O3", "e3", "Out").unwrap();

        let outputs: Vec<_> = (0..3).map(|_| Transport::<i32>::new()).collect();
        for (name, transport) in ["O1", "O2", "O3"].into_iter().zip(&outputs) {
            graph.set_out_port(name, transport).unwrap();
        }

        let completion = run(graph).unwrap();
        let received = [
            outputs[0].recv().await,
            outputs[1].recv().await,
            outputs[2].recv().await,
        ];
        assert_eq!(received, [Some(1), Some(2), Some(3)]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test]
    async fn initial_packet_is_delivered_without_other_senders() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.add_iip("e", "In", 42).unwrap();
        graph.map_out_port("Out", "e", "Out").unwrap();

        let output = Transport::<i32>::new();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        assert_eq!(drain(&output).await, vec![42]);
        assert!(completion.await.is_clean());
    }

    /// `In` -> a -> b -> `Out`, plus a spare export the parent never wires.
    fn echo_pair() -> Graph {
        let mut sub = Graph::new();
        sub.add("a", Echo::<i32>::new()).unwrap();
        sub.add("b", Echo::<i32>::new()).unwrap();
        sub.add("spare", Echo::<i32>::new()).unwrap();
        sub.connect("a", "Out", "b", "In").unwrap();
        sub.map_in_port("In", "a", "In").unwrap();
        sub.map_out_port("Out", "b", "Out").unwrap();
        sub.map_in_port("Spare", "spare", "In").unwrap();
        sub
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subgraph_as_sender() {
        let mut graph = Graph::new();
        graph.add("sub", echo_pair()).unwrap();
        graph.add("d", Doubler::new()).unwrap();
        graph.connect("sub", "Out", "d", "In").unwrap();
        graph.map_in_port("In", "sub", "In").unwrap();
        graph.map_out_port("Out", "d", "Out").unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::new();
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        feed(&input, 1..=5);

        assert_eq!(drain(&output).await, vec![2, 4, 6, 8, 10]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subgraph_as_receiver() {
        let mut graph = Graph::new();
        graph.add("d", Doubler::new()).unwrap();
        graph.add("sub", echo_pair()).unwrap();
        graph.connect("d", "Out", "sub", "In").unwrap();
        graph.map_in_port("In", "d", "In").unwrap();
        graph.map_out_port("Out", "sub", "Out").unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::new();
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        feed(&input, 1..=5);

        assert_eq!(drain(&output).await, vec![2, 4, 6, 8, 10]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test]
    async fn subgraph_ports_validate_like_process_ports() {
        let mut graph = Graph::new();
        graph.add("sub", echo_pair()).unwrap();
        graph.add("s", Echo::<String>::new()).unwrap();

        let err = graph.connect("sub", "In", "s", "In").unwrap_err();
        assert_eq!(
            err.to_string(),
            "connect 'sub.In': channel does not support direction chan<-"
        );
        assert!(matches!(
            graph.connect("sub", "Out", "s", "In"),
            Err(GraphError::TypeMismatch { .. })
        ));
        assert_eq!(
            graph.connect("sub", "Hidden", "s", "In").unwrap_err().to_string(),
            "connect: process 'sub' does not have port 'Hidden'"
        );
    }

    #[tokio::test]
    async fn unbound_top_level_export_fails_to_compile() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.map_in_port("In", "e", "In").unwrap();

        let err = run(graph).unwrap_err();
        assert_eq!(err, RunError::UnboundExport("In".to_string()));
        assert_eq!(
            err.to_string(),
            "run: exported port 'In' is not bound to a transport"
        );
    }

    #[tokio::test]
    async fn unbound_exports_can_be_allowed() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.map_in_port("In", "e", "In").unwrap();

        let options = NetworkOptions::default().with_require_bound_exports(false);
        let summary = run_with(graph, &options).unwrap().await;
        assert!(summary.is_clean());
        assert_eq!(summary.transports, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_winds_the_network_down() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.map_in_port("In", "e", "In").unwrap();
        graph.map_out_port("Out", "e", "Out").unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::with_capacity(4);
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let cancel = CancellationToken::new();
        let completion = run_until(graph, &NetworkOptions::default(), cancel.clone()).unwrap();

        input.send(7).await.unwrap();
        assert_eq!(output.recv().await, Some(7));

        cancel.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(5), completion)
            .await
            .expect("network should stop after cancellation");
        assert!(summary.is_clean());
        assert!(output.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_process_still_closes_downstream() {
        let mut graph = Graph::new();
        graph.add("boom", Faulty).unwrap();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.connect("boom", "Out", "e", "In").unwrap();
        graph.map_out_port("Out", "e", "Out").unwrap();

        let output = Transport::<i32>::new();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        assert!(drain(&output).await.is_empty());

        let summary = completion.await;
        assert_eq!(summary.panicked, vec!["boom".to_string()]);
        assert!(!summary.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn buffered_connections_let_writers_run_ahead() {
        let mut graph = Graph::new();
        graph.add("a", Echo::<i32>::new()).unwrap();
        graph.add("b", Echo::<i32>::new()).unwrap();
        graph.connect_buf("a", "Out", "b", "In", 16).unwrap();
        graph.map_in_port("In", "a", "In").unwrap();
        graph.map_out_port("Out", "b", "Out").unwrap();

        let input = Transport::<i32>::with_capacity(16);
        let output = Transport::<i32>::with_capacity(16);
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        for value in 0..10 {
            input.send(value).await.unwrap();
        }
        input.close();

        assert_eq!(drain(&output).await, (0..10).collect::<Vec<_>>());
        assert!(completion.await.is_clean());
    }

    #[tokio::test]
    async fn unconnected_processes_still_run_and_finish() {
        let mut graph = Graph::new();
        graph.add("lonely", Echo::<i32>::new()).unwrap();
        graph.add("idle", Doubler::new()).unwrap();

        let summary = run(graph).unwrap().await;
        assert_eq!(summary.processes, 2);
        assert!(summary.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn initial_packet_leaves_a_bound_input_open() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.map_in_port("In", "e", "In").unwrap();
        graph.map_out_port("Out", "e", "Out").unwrap();
        graph.add_iip("e", "In", 100).unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::new();
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        let reader = output.clone();
        let received = tokio::spawn(async move { drain(&reader).await });

        for value in 1..=3 {
            assert_eq!(input.send(value).await, Ok(()));
        }
        assert!(!input.is_closed());
        input.close();

        assert_eq!(received.await.unwrap(), vec![1, 2, 3, 100]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn internal_writer_leaves_a_bound_input_open() {
        let mut graph = Graph::new();
        graph.add("src", Echo::<i32>::new()).unwrap();
        graph.add("e", Echo::<i32>::new()).unwrap();
        graph.add_iip("src", "In", 100).unwrap();
        graph.connect("src", "Out", "e", "In").unwrap();
        graph.map_in_port("In", "e", "In").unwrap();
        graph.map_out_port("Out", "e", "Out").unwrap();

        let input = Transport::<i32>::new();
        let output = Transport::<i32>::new();
        graph.set_in_port("In", &input).unwrap();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        let reader = output.clone();
        let received = tokio::spawn(async move { drain(&reader).await });

        // give src time to finish and release its writer
        tokio::time::sleep(Duration::from_millis(20)).await;
        for value in 1..=3 {
            assert_eq!(input.send(value).await, Ok(()));
        }
        input.close();

        assert_eq!(received.await.unwrap(), vec![1, 2, 3, 100]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subgraph_behaves_like_its_flattened_processes() {
        let standalone = {
            let mut graph = echo_pair();
            let input = Transport::<i32>::new();
            let output = Transport::<i32>::new();
            graph.set_in_port("In", &input).unwrap();
            graph.set_out_port("Out", &output).unwrap();

            let options = NetworkOptions::default().with_require_bound_exports(false);
            let completion = run_with(graph, &options).unwrap();
            feed(&input, [5, 3, 9, 3]);
            let values = drain(&output).await;
            assert!(completion.await.is_clean());
            values
        };

        let nested = {
            let mut graph = Graph::new();
            graph.add("sub", echo_pair()).unwrap();
            graph.map_in_port("In", "sub", "In").unwrap();
            graph.map_out_port("Out", "sub", "Out").unwrap();
            let input = Transport::<i32>::new();
            let output = Transport::<i32>::new();
            graph.set_in_port("In", &input).unwrap();
            graph.set_out_port("Out", &output).unwrap();

            let completion = run(graph).unwrap();
            feed(&input, [5, 3, 9, 3]);
            let values = drain(&output).await;
            assert!(completion.await.is_clean());
            values
        };

        assert_eq!(standalone, vec![3, 3, 5, 9]);
        assert_eq!(nested, standalone);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fan_in_from_uneven_senders_closes_after_the_last() {
        let mut graph = Graph::new();
        graph.add("e", Echo::<i32>::new()).unwrap();
        let senders = [
            ("slow", 100, 1, Duration::from_millis(30)),
            ("chatty", 200, 5, Duration::from_millis(1)),
            ("steady", 300, 3, Duration::from_millis(5)),
        ];
        for (name, base, count, pause) in senders {
            graph.add(name, Burst { base, count, pause }).unwrap();
            graph.connect(name, "Out", "e", "In").unwrap();
        }
        graph.map_out_port("Out", "e", "Out").unwrap();

        let output = Transport::<i32>::new();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        let values = drain(&output).await;
        assert_eq!(values, vec![100, 200, 201, 202, 203, 204, 300, 301, 302]);
        assert!(output.is_closed());

        let summary = completion.await;
        assert!(summary.is_clean());
        assert_eq!(summary.transports, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subgraph_exports_sharing_an_inner_port_merge() {
        let mut sub = Graph::new();
        sub.add("a", Echo::<i32>::new()).unwrap();
        sub.map_in_port("A", "a", "In").unwrap();
        sub.map_in_port("B", "a", "In").unwrap();
        sub.map_out_port("Out", "a", "Out").unwrap();

        let mut graph = Graph::new();
        graph.add("x", Echo::<i32>::new()).unwrap();
        graph.add("y", Echo::<i32>::new()).unwrap();
        graph.add("sub", sub).unwrap();
        graph.connect("x", "Out", "sub", "A").unwrap();
        graph.connect("y", "Out", "sub", "B").unwrap();
        graph.add_iip("x", "In", 1).unwrap();
        graph.add_iip("y", "In", 2).unwrap();
        graph.map_out_port("Out", "sub", "Out").unwrap();

        let output = Transport::<i32>::new();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        assert_eq!(drain(&output).await, vec![1, 2]);
        assert!(completion.await.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn subgraph_that_cannot_compile_is_reported() {
        // one group carrying both an input and an output binding
        let mut sub = Graph::new();
        sub.add("a", Echo::<i32>::new()).unwrap();
        sub.add("b", Echo::<i32>::new()).unwrap();
        sub.connect("a", "Out", "b", "In").unwrap();
        sub.map_in_port("I", "b", "In").unwrap();
        sub.map_out_port("O", "a", "Out").unwrap();

        let mut graph = Graph::new();
        graph.add("x", Echo::<i32>::new()).unwrap();
        graph.add("y", Echo::<i32>::new()).unwrap();
        graph.add("sub", sub).unwrap();
        graph.add_iip("x", "In", 1).unwrap();
        graph.connect("x", "Out", "sub", "I").unwrap();
        graph.connect("sub", "O", "y", "In").unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(5), run(graph).unwrap())
            .await
            .expect("parent network should still complete");
        assert!(summary.panicked.is_empty());
        assert_eq!(summary.failed, vec!["sub".to_string()]);
        assert!(!summary.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panic_inside_a_subgraph_marks_the_parent_unclean() {
        let mut sub = Graph::new();
        sub.add("boom", Faulty).unwrap();
        sub.add("e", Echo::<i32>::new()).unwrap();
        sub.connect("boom", "Out", "e", "In").unwrap();
        sub.map_out_port("Out", "e", "Out").unwrap();

        let mut graph = Graph::new();
        graph.add("sub", sub).unwrap();
        graph.map_out_port("Out", "sub", "Out").unwrap();
        let output = Transport::<i32>::new();
        graph.set_out_port("Out", &output).unwrap();

        let completion = run(graph).unwrap();
        assert!(drain(&output).await.is_empty());

        let summary = completion.await;
        assert!(summary.panicked.is_empty());
        assert_eq!(summary.failed, vec!["sub".to_string()]);
    }
}
