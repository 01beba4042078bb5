//! FIX tag numbers and message types used by this core (§6).

/// Well-known FIX tag numbers.
pub mod tags {
    /// BeginString (8)
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength (9)
    pub const BODY_LENGTH: u32 = 9;
    /// MsgType (35)
    pub const MSG_TYPE: u32 = 35;
    /// SenderCompID (49)
    pub const SENDER_COMP_ID: u32 = 49;
    /// TargetCompID (56)
    pub const TARGET_COMP_ID: u32 = 56;
    /// MsgSeqNum (34)
    pub const MSG_SEQ_NUM: u32 = 34;
    /// SendingTime (52)
    pub const SENDING_TIME: u32 = 52;
    /// CheckSum (10)
    pub const CHECK_SUM: u32 = 10;
    /// EncryptMethod (98)
    pub const ENCRYPT_METHOD: u32 = 98;
    /// HeartBtInt (108)
    pub const HEART_BT_INT: u32 = 108;
    /// Username (553)
    pub const USERNAME: u32 = 553;
    /// Password (554)
    pub const PASSWORD: u32 = 554;
    /// TestReqID (112)
    pub const TEST_REQ_ID: u32 = 112;
    /// BeginSeqNo (7)
    pub const BEGIN_SEQ_NO: u32 = 7;
    /// EndSeqNo (16)
    pub const END_SEQ_NO: u32 = 16;
    /// PossDupFlag (43)
    pub const POSS_DUP_FLAG: u32 = 43;
    /// NewSeqNo (36)
    pub const NEW_SEQ_NO: u32 = 36;
    /// GapFillFlag (123)
    pub const GAP_FILL_FLAG: u32 = 123;
    /// GapFillFlag legacy alias used by some venues (122)
    pub const GAP_FILL_FLAG_LEGACY: u32 = 122;
    /// Text (58)
    pub const TEXT: u32 = 58;
    /// OrigSendingTime (60)
    pub const ORIG_SENDING_TIME: u32 = 60;
    /// NoMDEntries (268)
    pub const NO_MD_ENTRIES: u32 = 268;
    /// MDEntryType (269)
    pub const MD_ENTRY_TYPE: u32 = 269;
    /// MDEntryPx (270)
    pub const MD_ENTRY_PX: u32 = 270;
    /// MDEntrySize (271)
    pub const MD_ENTRY_SIZE: u32 = 271;
    /// MDPriceLevel (1023)
    pub const MD_PRICE_LEVEL: u32 = 1023;
    /// Symbol (55)
    pub const SYMBOL: u32 = 55;
    /// ClOrdID (11)
    pub const CL_ORD_ID: u32 = 11;
    /// Side (54)
    pub const SIDE: u32 = 54;
    /// OrderQty (38)
    pub const ORDER_QTY: u32 = 38;
    /// OrdType (40)
    pub const ORD_TYPE: u32 = 40;
    /// Price (44)
    pub const PRICE: u32 = 44;
    /// TimeInForce (59)
    pub const TIME_IN_FORCE: u32 = 59;
    /// ExecType (150)
    pub const EXEC_TYPE: u32 = 150;
    /// OrdStatus (39)
    pub const ORD_STATUS: u32 = 39;
    /// CumQty (14)
    pub const CUM_QTY: u32 = 14;
    /// LeavesQty (151)
    pub const LEAVES_QTY: u32 = 151;
    /// LastQty (32)
    pub const LAST_QTY: u32 = 32;
    /// LastPx (31)
    pub const LAST_PX: u32 = 31;
    /// MDReqID subscribe/unsubscribe type (263)
    pub const SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
}

/// Well-known `MsgType` (tag 35) values.
pub mod msg_type {
    /// Heartbeat
    pub const HEARTBEAT: &str = "0";
    /// TestRequest
    pub const TEST_REQUEST: &str = "1";
    /// ResendRequest
    pub const RESEND_REQUEST: &str = "2";
    /// Reject
    pub const REJECT: &str = "3";
    /// SequenceReset
    pub const SEQUENCE_RESET: &str = "4";
    /// Logout
    pub const LOGOUT: &str = "5";
    /// Logon
    pub const LOGON: &str = "A";
    /// NewOrderSingle
    pub const NEW_ORDER: &str = "D";
    /// OrderCancelRequest
    pub const CANCEL: &str = "F";
    /// ExecutionReport
    pub const EXECUTION_REPORT: &str = "8";
    /// OrderCancelReject
    pub const ORDER_CANCEL_REJECT: &str = "9";
    /// MarketDataRequest
    pub const MD_REQUEST: &str = "V";
    /// MarketDataSnapshot
    pub const MD_SNAPSHOT: &str = "W";
    /// MarketDataIncremental
    pub const MD_INCREMENTAL: &str = "X";
    /// TradeCaptureReport
    pub const TRADE_CAPTURE_REPORT: &str = "AE";
}
