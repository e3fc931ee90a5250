//! Tool-output fixtures
//!
//! Captured output of the external tools, one dialect per module. Parsers
//! are tested against these, and the integration tests script the
//! [`ScriptedRunner`](crate::ScriptedRunner) with them.

/// `ovs-vsctl` / `ovs-ofctl` output
pub mod ovs_fixtures {
    /// `ovs-vsctl list-br`
    pub const LIST_BR: &str = "br-ex\nbr-int\n\n";

    /// `ovs-vsctl list-ports br-int`
    pub const LIST_PORTS: &str = "eth1\nvxlan0\ntap-web\n";

    /// `ovs-vsctl get Port <port> tag` for an untagged port
    pub const TAG_NONE: &str = "[]";

    /// `ovs-vsctl get Interface <port> type` for a VXLAN port
    pub const TYPE_VXLAN: &str = "vxlan";

    /// `ovs-vsctl get Interface <port> type` for a system port
    pub const TYPE_SYSTEM: &str = "\"\"";

    /// `ovs-vsctl list Interface vxlan0 | grep options`
    pub const VXLAN_OPTIONS: &str =
        "options             : {key=\"5001\", remote_ip=\"192.168.50.2\"}";

    /// VXLAN options with an extra key and a flow-based key
    pub const VXLAN_OPTIONS_EXTRA: &str =
        "options             : {dst_port=\"4790\", key=flow, remote_ip=\"10.1.1.1\"}";

    /// `ovs-vsctl show`
    pub const SHOW: &str = r#"7d5f3b1a-2c0e-4a43-9d39-5f0a6a7f1c11
    Bridge br-int
        Port vxlan0
            Interface vxlan0
                type: vxlan
                options: {key="5001", remote_ip="192.168.50.2"}
        Port eth1
            tag: 100
            Interface eth1
        Port br-int
            Interface br-int
                type: internal
    ovs_version: "2.17.9""#;

    /// `ovs-ofctl dump-flows br-int`
    pub const DUMP_FLOWS: &str = "NXST_FLOW reply (xid=0x4):
 cookie=0x0, duration=8452.113s, table=0, n_packets=1204, n_bytes=98211, priority=100,ip,nw_dst=10.0.0.0/8 actions=output:2
 cookie=0x0, duration=8452.113s, table=0, n_packets=12, n_bytes=840, priority=50,arp actions=NORMAL
 cookie=0x0, duration=8452.110s, table=0, n_packets=0, n_bytes=0, priority=0 actions=NORMAL
 cookie=0x0, duration=8452.110s, table=1, n_packets=0, n_bytes=0, reset_counts in_port=3
";
}

/// `iptables -t <table> -vnL --line-numbers` output
pub mod iptables_fixtures {
    /// filter table with two populated chains and one empty chain
    pub const FILTER: &str = "Chain INPUT (policy ACCEPT 1024 packets, 88K bytes)
num   pkts bytes target     prot opt in     out     source               destination
1        0     0 ACCEPT     all  --  lo     *       0.0.0.0/0            0.0.0.0/0
2       12   720 DROP       tcp  --  *      *       10.9.0.0/16          0.0.0.0/0            tcp dpt:22

Chain FORWARD (policy DROP 0 packets, 0 bytes)
num   pkts bytes target     prot opt in     out     source               destination
1      310 25K ACCEPT     all  --  br-int *       0.0.0.0/0            0.0.0.0/0            ctstate RELATED,ESTABLISHED

Chain OUTPUT (policy ACCEPT 900 packets, 70K bytes)
num   pkts bytes target     prot opt in     out     source               destination
";

    /// nat table with one masquerade rule
    pub const NAT: &str = "Chain PREROUTING (policy ACCEPT 0 packets, 0 bytes)
num   pkts bytes target     prot opt in     out     source               destination

Chain POSTROUTING (policy ACCEPT 4 packets, 240 bytes)
num   pkts bytes target     prot opt in     out     source               destination
1        4   240 MASQUERADE  all  --  *      eth0    172.16.0.0/24        0.0.0.0/0
";
}

/// `ip` output
pub mod ip_fixtures {
    /// `ip netns list`
    pub const NETNS_LIST: &str = "blue (id: 0)\nred (id: 1)\ngreen\n";

    /// `ip link` in the host namespace
    pub const LINK_HOST: &str = "1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN mode DEFAULT group default qlen 1000
    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc fq_codel state UP mode DEFAULT group default qlen 1000
    link/ether 52:54:00:12:34:56 brd ff:ff:ff:ff:ff:ff
3: eth1: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc fq_codel master ovs-system state UP mode DEFAULT group default qlen 1000
    link/ether 52:54:00:ab:cd:ef brd ff:ff:ff:ff:ff:ff
4: ovs-system: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN mode DEFAULT group default qlen 1000
    link/ether 7a:1c:22:90:3e:01 brd ff:ff:ff:ff:ff:ff
";

    /// `ip netns exec blue ip link`
    pub const LINK_BLUE: &str = "1: lo: <LOOPBACK> mtu 65536 qdisc noop state DOWN mode DEFAULT group default qlen 1000
    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
5: tap-web: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1450 qdisc fq_codel state UP mode DEFAULT group default qlen 1000
    link/ether 2e:41:9a:0c:77:10 brd ff:ff:ff:ff:ff:ff
";

    /// `ip route show` in the host namespace
    pub const ROUTE_HOST: &str = "default via 192.168.1.1 dev eth0 proto dhcp metric 100
10.0.0.0/8 dev br-int proto kernel scope link src 10.0.0.1
192.168.1.0/24 dev eth0 proto kernel scope link src 192.168.1.20 metric 100
";

    /// `ip netns exec blue ip route show`
    pub const ROUTE_BLUE: &str = "10.20.0.0/24 dev tap-web proto kernel scope link src 10.20.0.5\n";
}
