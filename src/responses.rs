//! Response constants module.
//!
//! Contains all NNTP response codes and messages used throughout the server.

// Connection and status responses
pub const RESP_200_READY: &str = "200 Service available, posting allowed\r\n";
pub const RESP_201_READY_NO_POST: &str = "201 Service available, posting prohibited\r\n";
pub const RESP_200_POSTING_ALLOWED: &str = "200 Posting allowed\r\n";
pub const RESP_201_POSTING_PROHIBITED: &str = "201 Posting prohibited\r\n";
pub const RESP_205_CLOSING: &str = "205 Goodbye\r\n";

// Article responses
pub const RESP_224_OVERVIEW: &str = "224 Overview information follows (multi-line)\r\n";
pub const RESP_225_HEADERS: &str = "225 Headers follow (multi-line)\r\n";
pub const RESP_221_HEADER_FOLLOWS: &str = "221 Header follows (multi-line)\r\n";

// Group and list responses
pub const RESP_215_LIST_FOLLOWS: &str = "215 list of newsgroups follows\r\n";
pub const RESP_215_DESCRIPTIONS: &str = "215 descriptions follow\r\n";
pub const RESP_215_ACTIVE_TIMES: &str = "215 information follows\r\n";
pub const RESP_215_OVERVIEW_FMT: &str = "215 Order of fields in overview database.\r\n";
pub const RESP_231_NEWGROUPS: &str = "231 list of new newsgroups follows\r\n";

// Posting responses
pub const RESP_240_ARTICLE_RECEIVED: &str = "240 Article received OK\r\n";
pub const RESP_340_SEND_ARTICLE: &str =
    "340 Send article to be posted. End with <CR-LF>.<CR-LF>\r\n";

// Authentication responses
pub const RESP_281_AUTH_OK: &str = "281 Authentication accepted\r\n";
pub const RESP_381_PASSWORD_REQ: &str = "381 Password required\r\n";

// Feature responses
pub const RESP_290_FEATURE_ENABLED: &str = "290 feature enabled\r\n";
pub const RESP_382_CONTINUE_TLS: &str = "382 Continue with TLS negotiation\r\n";

// 4xx error responses
pub const RESP_403_BACKEND: &str = "403 Archive server temporarily offline\r\n";
pub const RESP_411_NO_SUCH_GROUP: &str = "411 No such newsgroup\r\n";
pub const RESP_412_NO_GROUP: &str = "412 No newsgroup selected\r\n";
pub const RESP_420_NO_CURRENT: &str = "420 No current article selected\r\n";
pub const RESP_421_NO_NEXT: &str = "421 No next article in this group\r\n";
pub const RESP_422_NO_PREV: &str = "422 No previous article in this group\r\n";
pub const RESP_423_NO_ARTICLE_NUM: &str = "423 No article with that number\r\n";
pub const RESP_423_RANGE_EMPTY: &str = "423 No articles in that range\r\n";
pub const RESP_430_NO_ARTICLE: &str = "430 No article with that message-id\r\n";
pub const RESP_440_POSTING_NOT_ALLOWED: &str = "440 Posting not allowed\r\n";
pub const RESP_441_POSTING_FAILED: &str = "441 Posting failed\r\n";
pub const RESP_480_PERMISSION: &str = "480 Permission denied\r\n";
pub const RESP_481_AUTH_REJECTED: &str = "481 Authentication failed\r\n";
pub const RESP_482_AUTH_SEQUENCE: &str =
    "482 Authentication commands issued out of sequence\r\n";

// 5xx error responses
pub const RESP_500_UNKNOWN_CMD: &str = "500 Unknown command\r\n";
pub const RESP_500_SYNTAX: &str = "500 Syntax error\r\n";
pub const RESP_501_SYNTAX: &str = "501 Syntax error\r\n";
pub const RESP_501_NOT_ENOUGH: &str = "501 Not enough arguments\r\n";
pub const RESP_501_INVALID_ARG: &str = "501 Invalid argument\r\n";
pub const RESP_501_INVALID_DATE: &str = "501 Invalid date\r\n";
pub const RESP_501_UNKNOWN_KEYWORD: &str = "501 Unknown keyword\r\n";
pub const RESP_501_MISSING_MODE: &str = "501 Missing mode\r\n";
pub const RESP_501_UNKNOWN_MODE: &str = "501 Unknown mode\r\n";
pub const RESP_502_ALREADY_AUTHENTICATED: &str = "502 Command unavailable\r\n";
pub const RESP_580_NO_TLS: &str = "580 Can not initiate TLS negotiation\r\n";

// Capability responses
pub const RESP_101_CAPABILITIES: &str = "101 Capability list:\r\n";

// Capability list items
pub const CAP_VERSION: &str = "VERSION 2";
pub const CAP_IMPLEMENTATION: &str =
    concat!("IMPLEMENTATION Annals ", env!("CARGO_PKG_VERSION"));
pub const CAP_READER: &str = "READER";
pub const CAP_POST: &str = "POST";
pub const CAP_HDR: &str = "HDR";
pub const CAP_OVER: &str = "OVER MSGID";
pub const CAP_LIST: &str = "LIST ACTIVE NEWSGROUPS ACTIVE.TIMES OVERVIEW.FMT";
pub const CAP_AUTHINFO: &str = "AUTHINFO USER";
pub const CAP_XFEATURE: &str = "XFEATURE-COMPRESS GZIP TERMINATOR";
pub const CAP_STARTTLS: &str = "STARTTLS";

// Overview format fields, in wire order
pub const OVERVIEW_FMT_FIELDS: &[&str] = &[
    "Subject:",
    "From:",
    "Date:",
    "Message-ID:",
    "References:",
    ":bytes",
    ":lines",
];
